//! Structured logging for the veldt terrain runtime.
//!
//! Provides span-based, filterable logging via the `tracing` ecosystem:
//! console output with uptime timestamps and module paths, plus JSON file
//! logging in debug builds for post-mortem analysis. The log level comes
//! from the configuration system and can be overridden with `RUST_LOG`.

use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use veldt_config::Config;

/// Initialize the tracing subscriber.
///
/// `log_dir` enables JSON file logging in debug builds. `config` supplies
/// the base log level; `RUST_LOG` takes precedence when set.
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = match config {
        Some(config) if !config.debug.log_level.is_empty() => config.debug.log_level.clone(),
        _ => default_filter_str().to_string(),
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true) // geometry workers are named
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    // In debug builds, also log to a file for post-mortem analysis.
    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join("veldt.log"))
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

fn default_filter_str() -> &'static str {
    // noise and rapier internals are chatty at debug level
    "info,rapier3d=warn"
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(default_filter_str())
}
