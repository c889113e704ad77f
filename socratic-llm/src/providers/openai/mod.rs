//! OpenAI-compatible provider
//!
//! Speaks the `/chat/completions` protocol shared by OpenRouter, OpenAI and
//! most self-hosted inference servers.

pub mod client;
pub mod types;

pub use client::{extract_chat_content, OpenAiCompatTransport};
