//! OpenAI-compatible HTTP transport

use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::providers::map_reqwest_error;
use crate::{CompletionRequest, CompletionTransport, RawResponse, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use socratic_core::GatewayConfig;
use std::time::Duration;

/// Transport for `/chat/completions` endpoints, authenticated with a bearer
/// token.
pub struct OpenAiCompatTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl OpenAiCompatTransport {
    /// Create a transport against `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, TransportError> {
        Self::new(config.base_url.clone(), config.request_timeout)
    }
}

#[async_trait]
impl CompletionTransport for OpenAiCompatTransport {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    async fn send(
        &self,
        credential: &str,
        request: &CompletionRequest,
    ) -> Result<RawResponse, TransportError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest::from(request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential)
            .header("Content-Type", "application/json")
            .header("X-Title", "Socratic")
            .json(&body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        Ok(RawResponse::new(status, text))
    }

    fn extract_content(&self, body: &str) -> Result<String, String> {
        extract_chat_content(body)
    }
}

/// Reply text at `choices[0].message.content`.
pub fn extract_chat_content(body: &str) -> Result<String, String> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| format!("Failed to parse response: {}", e))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| "response contained no message content".to_string())
}

impl std::fmt::Debug for OpenAiCompatTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatTransport")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
