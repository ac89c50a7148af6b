//! Logging setup using tracing.
//!
//! JSON output for log aggregation, or human-readable text for interactive
//! runs. `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{CliError, CliResult};

/// Build the filter from `RUST_LOG`, falling back to `level`.
pub fn build_filter(level: &str) -> CliResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| CliError::Config(format!("invalid log level '{level}': {e}")))
}

/// Initialize the global tracing subscriber.
pub fn init_logging(config: &LoggingConfig) -> CliResult<()> {
    let filter_layer = build_filter(&config.level)?;

    let registry = tracing_subscriber::registry().with(filter_layer);
    let result = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .flatten_event(true),
            )
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).try_init(),
    };
    result.map_err(|e| CliError::Config(format!("logging already initialized: {e}")))?;

    tracing::debug!(level = %config.level, format = ?config.format, "Logging initialized");
    Ok(())
}
