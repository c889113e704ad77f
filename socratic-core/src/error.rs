//! Error types for Socratic operations

use crate::SessionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a provider call was considered transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransientKind {
    RateLimited,
    Timeout,
}

impl std::fmt::Display for TransientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => f.write_str("rate limited"),
            Self::Timeout => f.write_str("timed out"),
        }
    }
}

/// Completion gateway errors.
///
/// `TransientProvider` and `HardProvider` are escalated inside the gateway
/// and only surface as the last error carried by `Exhausted`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("{model} {kind}: {message}")]
    TransientProvider {
        model: String,
        kind: TransientKind,
        message: String,
    },

    #[error("{model} failed with status {status}: {message}")]
    HardProvider {
        model: String,
        status: u16,
        message: String,
    },

    #[error("Failed to parse AI response as JSON: {reason}")]
    MalformedResponse { raw: String, reason: String },

    #[error("{message}")]
    Exhausted {
        message: String,
        last_error: Option<String>,
    },
}

/// Discriminant of [`GatewayError`], for callers that branch on the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayErrorKind {
    Configuration,
    TransientProvider,
    HardProvider,
    MalformedResponse,
    Exhausted,
}

impl GatewayError {
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::Configuration { .. } => GatewayErrorKind::Configuration,
            Self::TransientProvider { .. } => GatewayErrorKind::TransientProvider,
            Self::HardProvider { .. } => GatewayErrorKind::HardProvider,
            Self::MalformedResponse { .. } => GatewayErrorKind::MalformedResponse,
            Self::Exhausted { .. } => GatewayErrorKind::Exhausted,
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn malformed(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}

/// Result of every orchestration operation: a decoded payload or a
/// classified failure.
pub type CompletionOutcome<T> = Result<T, GatewayError>;

/// Record kinds held by the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Session,
    Exchange,
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Record not found: {kind:?} for session {id}")]
    NotFound { kind: RecordKind, id: SessionId },

    #[error("Record already exists: {kind:?} for session {id}")]
    AlreadyExists { kind: RecordKind, id: SessionId },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Provider not supported: {provider}")]
    ProviderNotSupported { provider: String },
}

/// Master error type for all Socratic errors.
#[derive(Debug, Clone, Error)]
pub enum SocraticError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Socratic operations.
pub type SocraticResult<T> = Result<T, SocraticError>;

// =============================================================================
// TESTS
// =============================================================================
