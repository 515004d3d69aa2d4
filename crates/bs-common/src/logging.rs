//! Process-wide tracing setup shared by the binaries.

use std::panic;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Logging knobs read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogSettings {
    /// `BS_LOG_DIR`: daily-rotated files instead of stdout.
    pub dir: Option<PathBuf>,
    /// `BS_LOG_INCLUDE_BACKTRACE`: also run the default panic hook.
    pub include_backtrace: bool,
    /// `BS_LOG_COMPACT`: single-line compact formatter.
    pub compact: bool,
}

fn truthy(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            dir: lookup("BS_LOG_DIR")
                .map(|dir| dir.trim().to_string())
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            include_backtrace: lookup("BS_LOG_INCLUDE_BACKTRACE").is_some_and(|v| truthy(&v)),
            compact: lookup("BS_LOG_COMPACT").is_some_and(|v| truthy(&v)),
        }
    }
}

/// Routes panics through `tracing` so they land next to request logs.
/// Installed at most once per process.
pub fn install_tracing_panic_hook(app_name: &'static str) {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    let include_backtrace = LogSettings::from_env().include_backtrace;

    INSTALLED.get_or_init(|| {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let thread = std::thread::current();
            let location = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()))
                .unwrap_or_else(|| "unknown".into());
            let payload = info.payload();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".into());

            tracing::error!(
                service = app_name,
                thread = thread.name().unwrap_or("unnamed"),
                %location,
                panic_message = %message,
                "panic"
            );

            if include_backtrace {
                default_hook(info);
            }
        }));
    });
}

fn file_writer(app_name: &'static str, dir: PathBuf) -> Option<BoxMakeWriter> {
    if let Err(err) = std::fs::create_dir_all(&dir) {
        eprintln!("{app_name}: cannot create log directory {}: {err}; using stdout", dir.display());
        return None;
    }
    let appender = tracing_appender::rolling::daily(dir, format!("{app_name}.log"));
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(BoxMakeWriter::new(writer))
}

/// Installs the global subscriber. `RUST_LOG` drives filtering (default `info`).
pub fn init_tracing_subscriber(app_name: &'static str) {
    let settings = LogSettings::from_env();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let writer = settings
        .dir
        .clone()
        .and_then(|dir| file_writer(app_name, dir))
        .unwrap_or_else(|| BoxMakeWriter::new(std::io::stdout));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false);
    let _ = if settings.compact {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> LogSettings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_to_stdout_without_backtraces() {
        assert_eq!(settings(&[]), LogSettings::default());
    }

    #[test]
    fn reads_directory_and_flags() {
        let parsed = settings(&[
            ("BS_LOG_DIR", " /var/log/bitspark "),
            ("BS_LOG_INCLUDE_BACKTRACE", "TRUE"),
            ("BS_LOG_COMPACT", "0"),
        ]);
        assert_eq!(parsed.dir, Some(PathBuf::from("/var/log/bitspark")));
        assert!(parsed.include_backtrace);
        assert!(!parsed.compact);
    }

    #[test]
    fn blank_directory_is_ignored() {
        assert_eq!(settings(&[("BS_LOG_DIR", "  ")]).dir, None);
    }
}
