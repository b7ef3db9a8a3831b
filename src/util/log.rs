use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogConfig, LogFormat};

/// Initialize structured logging with tracing.
///
/// Log level can be controlled via RUST_LOG env var, falling back to the
/// configured level ("info" by default).
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (pretty, json) = match config.format {
        LogFormat::Pretty => (
            Some(fmt::layer().with_target(true).with_thread_ids(false)),
            None,
        ),
        LogFormat::Json => (None, Some(fmt::layer().json().with_current_span(false))),
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(pretty)
        .with(json)
        .with(filter)
        .try_init()
    {
        eprintln!("Logging already initialized: {}", e);
    }
}
