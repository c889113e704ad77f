//! Tracing subscriber initialization
//!
//! Installs one global `tracing-subscriber` registry: an `EnvFilter`
//! followed by a JSON or human-readable fmt layer writing to stderr, so log
//! lines never interleave with the terminal dialogue on stdout.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::error::{ApiError, ApiResult};

/// Directives used when neither the config nor `RUST_LOG` provide any.
pub const DEFAULT_FILTER: &str = "socratic=info,socratic_llm=info,warn";

/// Build the filter: explicit directives win, then `RUST_LOG`, then
/// [`DEFAULT_FILTER`].
pub fn build_filter(directives: Option<&str>) -> ApiResult<EnvFilter> {
    match directives {
        Some(directives) => EnvFilter::try_new(directives).map_err(|e| {
            ApiError::internal_error(format!("Invalid log filter '{}': {}", directives, e))
        }),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

/// Initialize the global subscriber. Call once at startup.
pub fn init_tracing(format: LogFormat, directives: Option<&str>) -> ApiResult<()> {
    let env_filter = build_filter(directives)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::debug!(format = ?format, "Tracing initialized");
    Ok(())
}
