//! Socratic Storage - Session Store Trait and In-Memory Implementation
//!
//! Defines the persistence collaborator the learning service drives:
//! sessions with their transcripts, per-question exchanges, and aggregate
//! learning statistics.

pub mod memory;

pub use memory::InMemoryStore;

use socratic_core::{
    DifficultyLevel, Exchange, LearningSession, LearningStats, SessionId, SocraticResult,
    SummaryReply, Timestamp, Transcript,
};

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for sessions. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub is_active: Option<bool>,
    pub ended_at: Option<Timestamp>,
    pub total_exchanges: Option<i32>,
    pub final_understanding_score: Option<i32>,
    pub highest_difficulty: Option<DifficultyLevel>,
    pub hints_used: Option<i32>,
    pub summary: Option<SummaryReply>,
    /// Replaces the whole transcript.
    pub transcript: Option<Transcript>,
}

/// Update payload for exchanges.
#[derive(Debug, Clone, Default)]
pub struct ExchangeUpdate {
    pub student_response: Option<String>,
    pub understanding_score: Option<i32>,
    pub correct_insights: Option<Vec<String>>,
    pub misconceptions: Option<Vec<String>>,
    pub gaps: Option<Vec<String>>,
    pub hint_used: Option<bool>,
    pub hint_text: Option<String>,
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Persistence for learning sessions, their exchanges, and the aggregate
/// stats record.
pub trait SessionStore: Send + Sync {
    // === Session Operations ===

    /// Insert a new session. Fails if the id is already present.
    fn session_insert(&self, session: &LearningSession) -> SocraticResult<()>;

    fn session_get(&self, id: SessionId) -> SocraticResult<Option<LearningSession>>;

    /// Apply `update` and return the session as stored afterwards.
    fn session_update(&self, id: SessionId, update: SessionUpdate)
        -> SocraticResult<LearningSession>;

    /// All sessions, most recently started first.
    fn session_list(&self) -> SocraticResult<Vec<LearningSession>>;

    /// Remove a session together with its exchanges.
    fn session_delete(&self, id: SessionId) -> SocraticResult<()>;

    // === Exchange Operations ===

    fn exchange_insert(&self, exchange: &Exchange) -> SocraticResult<()>;

    /// Exchange with the highest number for the session.
    fn exchange_latest(&self, session_id: SessionId) -> SocraticResult<Option<Exchange>>;

    fn exchange_update(
        &self,
        session_id: SessionId,
        exchange_number: i32,
        update: ExchangeUpdate,
    ) -> SocraticResult<()>;

    /// Exchanges in ascending number order.
    fn exchange_list(&self, session_id: SessionId) -> SocraticResult<Vec<Exchange>>;

    // === Stats Operations ===

    fn stats_get(&self) -> SocraticResult<LearningStats>;

    /// Fold an ended session into the aggregate stats and return them.
    ///
    /// The running average is recomputed over every ended session, so the
    /// session must already be stored as inactive.
    fn stats_record_session_end(&self, session: &LearningSession)
        -> SocraticResult<LearningStats>;
}
