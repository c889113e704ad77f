//! Error Types for the Socratic service layer
//!
//! This module defines the errors handed to callers of
//! [`LearningService`](crate::LearningService):
//! - ApiError struct for structured error responses
//! - ErrorCode enum with the HTTP status a web layer should answer with
//!
//! All errors serialize as JSON so a front end can render them directly.

use serde::{Deserialize, Serialize};
use socratic_core::{
    ConfigError, GatewayError, GatewayErrorKind, RecordKind, SocraticError, StorageError,
};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for service responses.
///
/// Each code maps to one HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request contains invalid input data
    InvalidInput,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested learning session does not exist
    SessionNotFound,

    /// Requested record does not exist
    EntityNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    EntityAlreadyExists,

    /// Operation conflicts with the session's current state
    StateConflict,

    // ========================================================================
    // Provider Errors (502, 503)
    // ========================================================================
    /// No usable provider key or model list
    ProviderNotConfigured,

    /// Every candidate model failed
    ProviderUnavailable,

    /// Provider answered but the reply could not be decoded
    MalformedProviderResponse,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    InternalError,

    /// Session store failure
    StorageError,

    /// Configuration could not be loaded
    ConfigurationError,
}

impl ErrorCode {
    /// HTTP status code for this error code.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::InvalidInput => 400,

            ErrorCode::SessionNotFound | ErrorCode::EntityNotFound => 404,

            ErrorCode::EntityAlreadyExists | ErrorCode::StateConflict => 409,

            ErrorCode::ProviderUnavailable | ErrorCode::MalformedProviderResponse => 502,

            ErrorCode::ProviderNotConfigured => 503,

            ErrorCode::InternalError
            | ErrorCode::StorageError
            | ErrorCode::ConfigurationError => 500,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::SessionNotFound => "Learning session not found",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::EntityAlreadyExists => "Entity already exists",
            ErrorCode::StateConflict => "Operation conflicts with current state",
            ErrorCode::ProviderNotConfigured => "AI provider is not configured",
            ErrorCode::ProviderUnavailable => "AI provider is unavailable",
            ErrorCode::MalformedProviderResponse => "AI provider returned an unreadable reply",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageError => "Session storage failed",
            ErrorCode::ConfigurationError => "Invalid configuration",
        }
    }

    /// True for codes caused by the caller's request rather than the system.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error returned by every service operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (raw provider text, field names)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn session_not_found(session_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::SessionNotFound,
            format!("Session {} not found", session_id),
        )
    }

    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StateConflict, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let code = match err.kind() {
            GatewayErrorKind::Configuration => ErrorCode::ProviderNotConfigured,
            GatewayErrorKind::MalformedResponse => ErrorCode::MalformedProviderResponse,
            GatewayErrorKind::TransientProvider
            | GatewayErrorKind::HardProvider
            | GatewayErrorKind::Exhausted => ErrorCode::ProviderUnavailable,
        };
        let api = ApiError::new(code, err.to_string());
        match err {
            GatewayError::MalformedResponse { raw, .. } => {
                api.with_details(serde_json::json!({ "raw": raw }))
            }
            GatewayError::Exhausted {
                last_error: Some(last),
                ..
            } => api.with_details(serde_json::json!({ "last_error": last })),
            _ => api,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound {
                kind: RecordKind::Session,
                id,
            } => ApiError::session_not_found(id),
            StorageError::NotFound { .. } => {
                ApiError::new(ErrorCode::EntityNotFound, err.to_string())
            }
            StorageError::AlreadyExists { .. } => {
                ApiError::new(ErrorCode::EntityAlreadyExists, err.to_string())
            }
            StorageError::LockPoisoned => ApiError::storage_error(err.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigurationError, err.to_string())
    }
}

impl From<SocraticError> for ApiError {
    fn from(err: SocraticError) -> Self {
        match err {
            SocraticError::Gateway(e) => e.into(),
            SocraticError::Storage(e) => e.into(),
            SocraticError::Config(e) => e.into(),
        }
    }
}

/// Result type for service operations.
pub type ApiResult<T> = Result<T, ApiError>;
