//! Logging initialization using the `tracing` ecosystem.
//!
//! Provides:
//! - Console output (colored, human-readable)
//! - File output (daily rotation via `tracing-appender`)
//! - Configurable log level via env var `RUST_LOG` or explicit parameter

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once: only the first call installs a subscriber and
/// returns `true`; later calls are no-ops returning `false`.
///
/// # Parameters
///
/// - `log_level`: default level if `RUST_LOG` env var is not set (e.g. `"info"`)
/// - `log_dir`: optional directory for daily-rotating log files
/// - `module_name`: used as the log file prefix (e.g. `"mkt-relay"`)
pub fn init_logging(log_level: &str, log_dir: Option<&str>, module_name: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(true);

    let installed = if let Some(dir) = log_dir {
        let file_appender = tracing_appender::rolling::daily(dir, module_name);
        let file_layer = fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()
    };

    installed.is_ok()
}

/// [`init_logging`] driven by the `logging` config block.
pub fn init_from_config(config: &LogConfig) -> bool {
    init_logging(&config.level, config.dir.as_deref(), &config.module_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_noop() {
        let first = init_from_config(&LogConfig::default());
        let second = init_logging("debug", None, "mkt-test");
        // Another test binary may already own the global subscriber, so only
        // the repeat call is asserted.
        let _ = first;
        assert!(!second);
        tracing::info!("logging initialized");
    }
}
