use std::{future::Future, sync::OnceLock, time::Instant};

use tracing::warn;

fn slow_query_threshold_ms() -> Option<u64> {
    static CACHE: OnceLock<Option<u64>> = OnceLock::new();

    *CACHE.get_or_init(|| {
        std::env::var("BS_DB_LOG_MIN_DURATION_MS")
            .ok()
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(|v| v.max(0) as u64)
            .filter(|v| *v > 0)
    })
}

fn is_slow(elapsed_ms: u64, threshold_ms: Option<u64>) -> bool {
    threshold_ms.is_some_and(|threshold| elapsed_ms >= threshold)
}

/// Awaits a query future and logs it when it exceeds `BS_DB_LOG_MIN_DURATION_MS`.
pub async fn timed<F, T>(label: &'static str, query: F) -> T
where
    F: Future<Output = T>,
{
    let started = Instant::now();
    let result = query.await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if is_slow(elapsed_ms, slow_query_threshold_ms()) {
        warn!(query = label, elapsed_ms, "slow_query_detected");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_disabled_when_unset() {
        assert!(!is_slow(10_000, None));
        assert!(is_slow(250, Some(200)));
        assert!(!is_slow(199, Some(200)));
    }

    #[tokio::test]
    async fn timed_passes_result_through() {
        let value = timed("noop", async { 41 + 1 }).await;
        assert_eq!(value, 42);
    }
}
