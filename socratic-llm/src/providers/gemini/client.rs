//! Gemini HTTP transport

use super::types::{GenerateContentRequest, GenerateContentResponse};
use crate::providers::map_reqwest_error;
use crate::{CompletionRequest, CompletionTransport, RawResponse, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use socratic_core::GatewayConfig;
use std::time::Duration;

/// Transport for the Generative Language `generateContent` endpoint.
pub struct GeminiTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl GeminiTransport {
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

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl CompletionTransport for GeminiTransport {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn send(
        &self,
        credential: &str,
        request: &CompletionRequest,
    ) -> Result<RawResponse, TransportError> {
        let body = GenerateContentRequest::from(request);

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", credential)
            .header("Content-Type", "application/json")
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
        extract_candidate_text(body)
    }
}

/// Concatenated text parts of the first candidate.
pub fn extract_candidate_text(body: &str) -> Result<String, String> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| format!("Failed to parse response: {}", e))?;
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| "response contained no candidates".to_string())?;
    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(format!("candidate had no text (finish reason: {})", reason));
    }
    Ok(text)
}

impl std::fmt::Debug for GeminiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiTransport")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatMessage;

    #[test]
    fn test_endpoint_includes_model() {
        let transport = GeminiTransport::new(
            "https://generativelanguage.googleapis.com/v1beta",
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(
            transport.endpoint("gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_candidate_parts_are_concatenated() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"hint\":"},{"text":"\"look closer\"}"}]},"finishReason":"STOP"}]}"#;
        assert_eq!(
            extract_candidate_text(body).unwrap(),
            r#"{"hint":"look closer"}"#
        );
    }

    #[test]
    fn test_blocked_candidate_is_an_error() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let err = extract_candidate_text(body).unwrap_err();
        assert!(err.contains("SAFETY"));
        assert!(extract_candidate_text(r#"{"candidates":[]}"#).is_err());
    }

    #[test]
    fn test_request_body_shape() {
        let request = CompletionRequest {
            model: "gemini-2.0-flash".to_string(),
            messages: vec![ChatMessage::system("be socratic"), ChatMessage::user("topic")],
            temperature: 0.9,
            max_tokens: 1024,
            json_response: true,
        };
        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be socratic");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "topic");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert!(body["generationConfig"]["topP"].as_f64().unwrap() > 0.94);
    }
}
