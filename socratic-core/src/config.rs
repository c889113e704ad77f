//! Configuration types

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenRouter's OpenAI-compatible endpoint.
pub const OPENAI_COMPAT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Google Generative Language REST endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Free-tier candidates, most capable first.
pub const DEFAULT_OPENAI_COMPAT_MODELS: [&str; 4] = [
    "google/gemini-2.0-flash-exp:free",
    "meta-llama/llama-3.3-70b-instruct:free",
    "mistralai/mistral-7b-instruct:free",
    "google/gemma-2-9b-it:free",
];

pub const DEFAULT_GEMINI_MODELS: [&str; 2] = ["gemini-2.0-flash", "gemini-1.5-flash"];

/// Values shipped in sample env files; a key equal to one of these counts
/// as not configured.
pub const PLACEHOLDER_CREDENTIALS: [&str; 5] = [
    "your_api_key_here",
    "your-api-key-here",
    "your_openrouter_api_key_here",
    "your_gemini_api_key_here",
    "changeme",
];

/// True for blank keys and known placeholders (case-insensitive).
pub fn is_placeholder_credential(key: &str) -> bool {
    let key = key.trim();
    key.is_empty()
        || PLACEHOLDER_CREDENTIALS
            .iter()
            .any(|placeholder| key.eq_ignore_ascii_case(placeholder))
}

// ============================================================================
// RETRY
// ============================================================================

/// Retry configuration for provider calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per candidate model, including the first.
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Fixed wait before retrying after a request timeout.
    pub timeout_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            timeout_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    /// Backoff before retrying after the given 1-based attempt was rate
    /// limited: `base * multiplier^(attempt - 1)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let seconds = self.base_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

// ============================================================================
// PROVIDER
// ============================================================================

/// Which completion backend the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Any `/chat/completions` endpoint (OpenRouter by default).
    OpenAiCompatible,
    /// Google Gemini `generateContent`.
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAiCompatible => "openai_compatible",
            Self::Gemini => "gemini",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai_compatible" | "openai-compatible" | "openai" | "openrouter" => {
                Ok(Self::OpenAiCompatible)
            }
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(ConfigError::ProviderNotSupported {
                provider: other.to_string(),
            }),
        }
    }

    /// Environment variable that conventionally holds this backend's key.
    pub fn credential_env_var(&self) -> &'static str {
        match self {
            Self::OpenAiCompatible => "OPENROUTER_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAiCompatible => OPENAI_COMPAT_BASE_URL,
            Self::Gemini => GEMINI_BASE_URL,
        }
    }

    pub fn default_models(&self) -> Vec<String> {
        match self {
            Self::OpenAiCompatible => DEFAULT_OPENAI_COMPAT_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            Self::Gemini => DEFAULT_GEMINI_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Everything the completion gateway needs besides a transport and a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    /// Ordered candidate models; the first is tried first.
    pub models: Vec<String>,
    pub request_timeout: Duration,
    pub max_tokens: u32,
    pub retry: RetryConfig,
}

impl GatewayConfig {
    /// Defaults for the given provider.
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            models: provider.default_models(),
            request_timeout: Duration::from_secs(30),
            max_tokens: 1024,
            retry: RetryConfig::default(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "base_url".to_string(),
            });
        }
        if self.models.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "models".to_string(),
            });
        }
        if let Some(blank) = self.models.iter().position(|m| m.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: format!("models[{}]", blank),
                value: String::new(),
                reason: "model name must not be empty".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_tokens".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.retry.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_retries".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.retry.backoff_multiplier >= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "retry.backoff_multiplier".to_string(),
                value: self.retry.backoff_multiplier.to_string(),
                reason: "must be >= 1.0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::for_provider(ProviderKind::OpenAiCompatible)
    }
}

// ============================================================================
// TEMPERATURES
// ============================================================================

/// Sampling temperature per orchestration operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureProfile {
    pub start: f32,
    pub continue_dialogue: f32,
    pub hint: f32,
    pub summary: f32,
    pub suggestions: f32,
}

impl Default for TemperatureProfile {
    fn default() -> Self {
        Self {
            start: 0.7,
            continue_dialogue: 0.7,
            hint: 0.7,
            summary: 0.5,
            suggestions: 0.9,
        }
    }
}
