//! Structured logging for the Skirmish multiplayer layer.
//!
//! Console output with timestamps and module paths via the `tracing`
//! ecosystem, plus JSON file logging in debug builds for post-mortem
//! analysis of desync reports. Respects `RUST_LOG` and the config system's
//! log level override.

use std::path::Path;

use skirmish_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter: info everywhere, but keep the per-frame transport
/// modules at warn so steady-state traffic doesn't drown the log.
const DEFAULT_FILTER: &str = "info,skirmish_net::framing=warn";

/// Initialize the tracing subscriber.
///
/// * `log_dir` - optional directory for JSON log files (debug builds only)
/// * `debug_build` - whether this is a debug build (enables file logging)
/// * `config` - optional configuration for the log level override
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = match config {
        Some(config) if !config.debug.log_level.is_empty() => config.debug.log_level.clone(),
        _ => DEFAULT_FILTER.to_string(),
    };

    // RUST_LOG wins over both the config override and the default.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join("skirmish.log"))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_quiets_framing() {
        let filter = default_env_filter();
        let filter_str = format!("{}", filter);
        assert!(filter_str.contains("skirmish_net::framing=warn"));
        assert!(filter_str.contains("info"));
    }

    #[test]
    fn test_subsystem_filter_parses() {
        let valid_filters = [
            "info",
            "debug,skirmish_net=trace",
            "warn,skirmish_multiplayer=debug,skirmish_world=trace",
            "error",
        ];
        for filter_str in &valid_filters {
            assert!(
                EnvFilter::try_from(*filter_str).is_ok(),
                "failed to parse filter: {}",
                filter_str
            );
        }
    }

    #[test]
    fn test_log_file_path_shape() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_file_path = temp_dir.path().join("skirmish.log");
        assert_eq!(log_file_path.file_name().unwrap(), "skirmish.log");
    }
}
