//! Socratic Core - Dialogue Types
//!
//! Pure data structures shared by every Socratic crate: transcripts and
//! reply shapes, persisted session records, configuration, and the error
//! taxonomy. No I/O lives here.

pub mod config;
pub mod dialogue;
pub mod entities;
pub mod error;

pub use config::{
    is_placeholder_credential, GatewayConfig, ProviderKind, RetryConfig, TemperatureProfile,
    DEFAULT_GEMINI_MODELS, DEFAULT_OPENAI_COMPAT_MODELS, GEMINI_BASE_URL,
    OPENAI_COMPAT_BASE_URL, PLACEHOLDER_CREDENTIALS,
};
pub use dialogue::{
    clamp_score, DifficultyLevel, DifficultyLevelParseError, HintReply, Role, StructuredReply,
    SuggestionReply, SummaryReply, TopicSuggestion, Transcript, Turn, TurnContent,
    UnderstandingSignals,
};
pub use entities::{
    new_session_id, round1, Exchange, LearningSession, LearningStats, SessionId, Timestamp,
};
pub use error::{
    CompletionOutcome, ConfigError, GatewayError, GatewayErrorKind, RecordKind, SocraticError,
    SocraticResult, StorageError, TransientKind,
};
