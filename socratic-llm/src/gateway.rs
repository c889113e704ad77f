//! Resilient completion gateway
//!
//! Sends one request per attempt through a [`CompletionTransport`] and
//! escalates failures along a fixed ladder:
//!
//! | Outcome                  | Action                                     |
//! |--------------------------|--------------------------------------------|
//! | 200, decodes             | return the payload                         |
//! | 200, does not decode     | return `MalformedResponse`, no retry       |
//! | rate limited             | exponential backoff, retry the same model  |
//! | timeout                  | fixed backoff, retry the same model        |
//! | any other status         | next model immediately                     |
//! | connection fault         | next model immediately                     |
//! | retries used up          | next model                                 |
//! | no models left           | `Exhausted` with the last error            |

use crate::credentials::CredentialProvider;
use crate::decoder::decode_reply;
use crate::providers::extract_error_message;
use crate::{ChatMessage, CompletionRequest, CompletionTransport, RawResponse, TransportError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use socratic_core::{
    is_placeholder_credential, CompletionOutcome, GatewayConfig, GatewayError, TransientKind,
};
use std::sync::Arc;
use std::time::Duration;

/// Body fragments that mark a quota refusal regardless of status code.
/// Matched case-insensitively.
const RATE_LIMIT_MARKERS: [&str; 3] = ["quota", "resource_exhausted", "too many requests"];

/// True when a failed response means "slow down" rather than "this model
/// cannot serve you".
///
/// `rate` only counts as a whole word (`rate limit`, `rate-limited`,
/// `ratelimit`), so bodies mentioning e.g. "generate" stay hard errors.
pub fn is_rate_limited(status: u16, body: &str) -> bool {
    if status == 429 {
        return true;
    }
    let lowered = body.to_ascii_lowercase();
    RATE_LIMIT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
        || lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word == "rate" || word.starts_with("ratelimit"))
}

// ============================================================================
// SLEEPER
// ============================================================================

/// Waits between attempts. Injected so tests can observe backoff without
/// real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ============================================================================
// GATEWAY
// ============================================================================

/// What happened to one candidate model.
enum ModelOutcome<T> {
    /// Final answer for the whole call, success or terminal failure.
    Settled(CompletionOutcome<T>),
    /// Give up on this model and try the next one.
    Abandoned(GatewayError),
}

/// Retry, backoff and fallback over an ordered list of candidate models.
///
/// Holds no mutable state between calls; concurrent calls are independent.
pub struct CompletionGateway {
    transport: Arc<dyn CompletionTransport>,
    credentials: Arc<dyn CredentialProvider>,
    sleeper: Arc<dyn Sleeper>,
    config: GatewayConfig,
}

impl CompletionGateway {
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        credentials: Arc<dyn CredentialProvider>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            transport,
            credentials,
            sleeper: Arc::new(TokioSleeper),
            config,
        }
    }

    /// Replace the sleeper (tests inject a recording one).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// True when a usable key is available right now.
    pub fn is_configured(&self) -> bool {
        self.credentials.is_configured()
    }

    /// Run one completion and decode the reply into `T`.
    pub async fn complete<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> CompletionOutcome<T> {
        let credential = match self.credentials.credential() {
            Some(key) if !is_placeholder_credential(&key) => key,
            _ => {
                tracing::error!(
                    transport = self.transport.name(),
                    "No provider API key configured"
                );
                return Err(GatewayError::configuration(
                    "No API key configured. Set an API key before starting a session.",
                ));
            }
        };

        if self.config.models.is_empty() {
            return Err(GatewayError::configuration("No candidate models configured"));
        }

        let mut last_error: Option<GatewayError> = None;

        for (index, model) in self.config.models.iter().enumerate() {
            if let Some(previous) = &last_error {
                tracing::info!(
                    model = %model,
                    candidate = index + 1,
                    previous_error = %previous,
                    "Falling back to next model"
                );
            }

            let request = self.build_request(model, system_prompt, user_prompt, temperature);
            match self.try_model::<T>(&credential, &request).await {
                ModelOutcome::Settled(outcome) => return outcome,
                ModelOutcome::Abandoned(error) => last_error = Some(error),
            }
        }

        let exhausted = exhausted_error(last_error);
        tracing::error!(
            models = self.config.models.len(),
            error = %exhausted,
            "All candidate models failed"
        );
        Err(exhausted)
    }

    fn build_request(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> CompletionRequest {
        CompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
            temperature,
            max_tokens: self.config.max_tokens,
            json_response: true,
        }
    }

    async fn try_model<T: DeserializeOwned>(
        &self,
        credential: &str,
        request: &CompletionRequest,
    ) -> ModelOutcome<T> {
        let model = request.model.as_str();
        let retry = &self.config.retry;
        let mut attempt: u32 = 1;

        loop {
            tracing::debug!(model, attempt, "Sending completion request");

            let (error, delay) = match self.transport.send(credential, request).await {
                Ok(response) if response.is_ok() => {
                    return ModelOutcome::Settled(self.decode_success(model, &response));
                }
                Ok(response) if is_rate_limited(response.status, &response.body) => (
                    GatewayError::TransientProvider {
                        model: model.to_string(),
                        kind: TransientKind::RateLimited,
                        message: extract_error_message(&response.body),
                    },
                    retry.delay_for_attempt(attempt),
                ),
                Ok(response) => {
                    let error = GatewayError::HardProvider {
                        model: model.to_string(),
                        status: response.status,
                        message: extract_error_message(&response.body),
                    };
                    tracing::warn!(
                        model,
                        status = response.status,
                        error = %error,
                        "Provider rejected request, skipping model"
                    );
                    return ModelOutcome::Abandoned(error);
                }
                Err(TransportError::Timeout(after)) => (
                    GatewayError::TransientProvider {
                        model: model.to_string(),
                        kind: TransientKind::Timeout,
                        message: format!("no response after {:?}", after),
                    },
                    retry.timeout_backoff,
                ),
                Err(TransportError::Network(message)) => {
                    tracing::warn!(model, error = %message, "Request failed, skipping model");
                    return ModelOutcome::Abandoned(GatewayError::HardProvider {
                        model: model.to_string(),
                        status: 0,
                        message,
                    });
                }
            };

            if attempt >= retry.max_retries {
                tracing::warn!(
                    model,
                    attempts = attempt,
                    error = %error,
                    "Retry budget used up, skipping model"
                );
                return ModelOutcome::Abandoned(error);
            }

            tracing::warn!(
                model,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient provider failure, backing off"
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }

    fn decode_success<T: DeserializeOwned>(
        &self,
        model: &str,
        response: &RawResponse,
    ) -> CompletionOutcome<T> {
        let content = self
            .transport
            .extract_content(&response.body)
            .map_err(|reason| GatewayError::malformed(response.body.clone(), reason))?;
        let decoded = decode_reply::<T>(&content);
        match &decoded {
            Ok(_) => tracing::debug!(model, "Completion decoded"),
            Err(e) => tracing::warn!(model, error = %e, "Completion did not decode"),
        }
        decoded
    }
}

impl std::fmt::Debug for CompletionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionGateway")
            .field("transport", &self.transport.name())
            .field("models", &self.config.models)
            .finish()
    }
}

fn exhausted_error(last_error: Option<GatewayError>) -> GatewayError {
    let last_error = last_error.map(|e| e.to_string());
    let mut message = String::from(
        "All AI models are currently unavailable. Wait a minute and try again (free-tier \
         models are rate limited), check the credits and billing on your provider account, \
         or try a different API key.",
    );
    if let Some(last) = &last_error {
        message.push_str(" Last error: ");
        message.push_str(last);
    }
    GatewayError::Exhausted {
        message,
        last_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_429_is_rate_limited() {
        assert!(is_rate_limited(429, ""));
    }

    #[test]
    fn test_quota_body_is_rate_limited() {
        assert!(is_rate_limited(400, r#"{"error":{"message":"Quota exceeded for model"}}"#));
        assert!(is_rate_limited(503, "RESOURCE_EXHAUSTED"));
        assert!(is_rate_limited(500, "Too Many Requests"));
        assert!(is_rate_limited(403, "Rate limit reached for free models"));
        assert!(is_rate_limited(400, r#"{"error":"rate_limited"}"#));
        assert!(is_rate_limited(503, "RateLimitError"));
    }

    #[test]
    fn test_other_failures_are_hard() {
        assert!(!is_rate_limited(401, r#"{"error":{"message":"Invalid API key"}}"#));
        assert!(!is_rate_limited(404, "model not found"));
        assert!(!is_rate_limited(400, "cannot generate content for this request"));
    }

    #[test]
    fn test_exhausted_message_carries_last_error() {
        let err = exhausted_error(Some(GatewayError::HardProvider {
            model: "m".to_string(),
            status: 402,
            message: "Insufficient credits".to_string(),
        }));
        match err {
            GatewayError::Exhausted { message, last_error } => {
                assert!(message.contains("Last error: m failed with status 402"));
                assert!(message.contains("different API key"));
                assert_eq!(
                    last_error.as_deref(),
                    Some("m failed with status 402: Insufficient credits")
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_exhausted_without_last_error() {
        match exhausted_error(None) {
            GatewayError::Exhausted { message, last_error } => {
                assert!(!message.contains("Last error"));
                assert!(last_error.is_none());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
