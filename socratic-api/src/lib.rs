//! Socratic API - Learning Service Layer
//!
//! The caller-facing side of Socratic: the [`LearningService`] operations
//! that drive a guided-learning session and persist its progress, the
//! [`ApiError`] codes a web or terminal front end maps to responses,
//! configuration loading, and tracing setup.

pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;
pub mod terminal;

// Re-export commonly used types
pub use config::{AppConfig, ConfigLoadError, FileConfig, LogFormat};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use service::{sanitize_reply, EndedSession, LearningService, SessionDetail, StartedSession};
pub use telemetry::{init_tracing, DEFAULT_FILTER};
pub use terminal::Command;
