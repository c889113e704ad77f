//! Socratic LLM - Dialogue Orchestration and Resilient Completion
//!
//! Turns a conversation transcript into a single structured request to a
//! hosted completion provider and guarantees the caller gets back either a
//! decoded reply or a classified [`GatewayError`].
//!
//! Layers, leaves first:
//! - [`decoder`]: strips code fences and parses the reply text
//! - [`prompts`]: builds system/user text per interaction type
//! - [`gateway`]: retry, backoff, and model fallback over a transport
//! - [`orchestrator`]: one operation per learning interaction
//!
//! Transports implement [`CompletionTransport`]; concrete backends live in
//! [`providers`].

pub mod credentials;
pub mod decoder;
pub mod gateway;
pub mod mock;
pub mod orchestrator;
pub mod prompts;
pub mod providers;

pub use credentials::{CredentialProvider, CredentialStore};
pub use decoder::{decode_reply, strip_code_fences};
pub use gateway::{is_rate_limited, CompletionGateway, Sleeper, TokioSleeper};
pub use mock::{chat_completion_body, RecordingSleeper, ScriptedReply, ScriptedTransport};
pub use orchestrator::DialogueOrchestrator;
pub use prompts::{AssembledPrompt, PromptAssembler, PromptKind};
pub use providers::{build_transport, GeminiTransport, OpenAiCompatTransport};

pub use socratic_core::{CompletionOutcome, GatewayError, GatewayErrorKind};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// TRANSPORT TRAIT
// ============================================================================

/// Author of a request message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Backend-neutral completion request for one candidate model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the backend for a JSON object reply.
    pub json_response: bool,
}

impl CompletionRequest {
    /// Concatenated system messages, if any.
    pub fn system_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Concatenated user messages.
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Status and body of a provider response, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Failures below the HTTP layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Network(String),
}

/// A completion backend.
/// Implementations must be thread-safe (Send + Sync).
///
/// # Example
/// ```ignore
/// struct LocalLlama { /* ... */ }
///
/// #[async_trait]
/// impl CompletionTransport for LocalLlama {
///     fn name(&self) -> &str { "local" }
///     async fn send(&self, credential: &str, request: &CompletionRequest)
///         -> Result<RawResponse, TransportError> {
///         // POST to the local server
///     }
///     fn extract_content(&self, body: &str) -> Result<String, String> {
///         // Pull the reply text out of the body
///     }
/// }
/// ```
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Short backend identifier used in logs.
    fn name(&self) -> &str;

    /// Issue one request. HTTP error statuses are returned as `Ok`; only
    /// timeouts and connection-level faults are `Err`.
    async fn send(
        &self,
        credential: &str,
        request: &CompletionRequest,
    ) -> Result<RawResponse, TransportError>;

    /// Pull the reply text out of a successful response body.
    fn extract_content(&self, body: &str) -> Result<String, String>;
}
