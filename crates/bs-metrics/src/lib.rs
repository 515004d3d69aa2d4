use std::env;
use std::sync::OnceLock;

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

pub const METRICS_PORT_ENV: &str = "BS_METRICS_PORT";
pub const DEFAULT_METRICS_PORT: u16 = 9100;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize a Prometheus exporter listening on `0.0.0.0:<port>`.
///
/// The port is read from `port_env`, falling back to `default_port`. Later
/// calls return the handle installed by the first one.
pub fn init_metrics(port_env: &str, default_port: u16) -> Option<&'static PrometheusHandle> {
    if let Some(existing) = PROMETHEUS_HANDLE.get() {
        return Some(existing);
    }

    let port = env::var(port_env)
        .ok()
        .and_then(|raw| raw.trim().parse::<u16>().ok())
        .unwrap_or(default_port);

    match PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install_recorder()
    {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);
            info!(metrics_port = port, "started prometheus exporter");
            PROMETHEUS_HANDLE.get()
        }
        Err(err) => {
            warn!(error = %err, metrics_port = port, "failed to start prometheus exporter");
            PROMETHEUS_HANDLE.get()
        }
    }
}

/// Candidates returned by a swipe-deck or recommendation request.
pub fn record_matches_served(kind: &'static str, served: usize) {
    counter!("bitspark_matches_served_total", "kind" => kind).increment(served as u64);
}

pub fn record_daily_match_generated() {
    counter!("bitspark_daily_matches_generated_total").increment(1);
}

pub fn record_feedback(action: &'static str) {
    counter!("bitspark_feedback_total", "action" => action).increment(1);
}

/// Only counts rows that were actually created.
pub fn record_connection_created(connection_type: &'static str) {
    counter!("bitspark_connections_created_total", "type" => connection_type).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_noops_without_recorder() {
        record_matches_served("friends", 3);
        record_daily_match_generated();
        record_feedback("like");
        record_connection_created("friend");
    }
}
