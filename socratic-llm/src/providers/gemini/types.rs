//! Gemini `generateContent` request and response types

use crate::{CompletionRequest, MessageRole};
use serde::{Deserialize, Serialize};

/// Nucleus sampling bound sent with every request.
pub const DEFAULT_TOP_P: f32 = 0.95;

// ============================================================================
// REQUEST
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Content {
    fn text(role: Option<&str>, text: String) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: Some(text) }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

impl From<&CompletionRequest> for GenerateContentRequest {
    fn from(request: &CompletionRequest) -> Self {
        let contents = request
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| Content::text(Some("user"), m.content.clone()))
            .collect();
        Self {
            system_instruction: request.system_text().map(|text| Content::text(None, text)),
            contents,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: DEFAULT_TOP_P,
                max_output_tokens: request.max_tokens,
                response_mime_type: request
                    .json_response
                    .then(|| "application/json".to_string()),
            },
        }
    }
}

// ============================================================================
// RESPONSE
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}
