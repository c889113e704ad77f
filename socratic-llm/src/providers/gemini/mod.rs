//! Google Gemini provider

pub mod client;
pub mod types;

pub use client::{extract_candidate_text, GeminiTransport};
