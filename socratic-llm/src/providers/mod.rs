//! Completion backends
//!
//! Concrete [`CompletionTransport`](crate::CompletionTransport)
//! implementations for the hosted services the gateway can talk to.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiTransport;
pub use openai::OpenAiCompatTransport;

use crate::{CompletionTransport, TransportError};
use serde_json::Value;
use socratic_core::{GatewayConfig, ProviderKind};
use std::sync::Arc;

/// Longest error text kept from a non-JSON response body.
const MAX_ERROR_TEXT_CHARS: usize = 500;

/// Build the transport for the configured provider.
pub fn build_transport(
    config: &GatewayConfig,
) -> Result<Arc<dyn CompletionTransport>, TransportError> {
    Ok(match config.provider {
        ProviderKind::OpenAiCompatible => Arc::new(OpenAiCompatTransport::from_config(config)?),
        ProviderKind::Gemini => Arc::new(GeminiTransport::from_config(config)?),
    })
}

/// Human-readable message from an error response body.
///
/// Understands `{"error": {"message": ..}}`, `{"error": ".."}` and
/// `{"message": ..}`; anything else is returned as (truncated) text.
pub fn extract_error_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .get("error")
            .and_then(|error| {
                error
                    .get("message")
                    .and_then(Value::as_str)
                    .or_else(|| error.as_str())
            })
            .or_else(|| value.get("message").and_then(Value::as_str));
        if let Some(message) = message {
            return message.to_string();
        }
    }
    if trimmed.is_empty() {
        "Unknown error".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_TEXT_CHARS).collect()
    }
}

pub(crate) fn map_reqwest_error(error: reqwest::Error, timeout: std::time::Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Network(error.to_string())
    }
}
