//! Persisted records: sessions, exchanges, and aggregate statistics.

use crate::{DifficultyLevel, StructuredReply, SummaryReply, Transcript, Turn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session identifier (UUIDv7, sortable by creation time).
pub type SessionId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 session id.
pub fn new_session_id() -> SessionId {
    Uuid::now_v7()
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ============================================================================
// LEARNING SESSION
// ============================================================================

/// One guided-learning session on a single topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningSession {
    pub id: SessionId,
    pub topic: String,
    pub context: String,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub is_active: bool,
    pub total_exchanges: i32,
    pub final_understanding_score: i32,
    pub highest_difficulty: DifficultyLevel,
    pub hints_used: i32,
    pub summary: Option<SummaryReply>,
    pub transcript: Transcript,
}

impl LearningSession {
    /// Open a session whose transcript starts with the opening reply.
    pub fn new(
        topic: impl Into<String>,
        context: impl Into<String>,
        opening: StructuredReply,
    ) -> Self {
        let mut transcript = Transcript::new();
        transcript.push(Turn::assistant(opening));
        Self {
            id: new_session_id(),
            topic: topic.into(),
            context: context.into(),
            started_at: Utc::now(),
            ended_at: None,
            is_active: true,
            total_exchanges: 0,
            final_understanding_score: 0,
            highest_difficulty: DifficultyLevel::Foundational,
            hints_used: 0,
            summary: None,
            transcript,
        }
    }

    /// Minutes from start to end, or to now while the session is active.
    pub fn duration_minutes(&self) -> f64 {
        self.duration_minutes_at(Utc::now())
    }

    pub fn duration_minutes_at(&self, now: Timestamp) -> f64 {
        let end = self.ended_at.unwrap_or(now);
        let seconds = (end - self.started_at).num_milliseconds() as f64 / 1000.0;
        round1(seconds.max(0.0) / 60.0)
    }

    /// Raise the highest difficulty reached; never lowers it.
    pub fn raise_difficulty(&mut self, level: DifficultyLevel) {
        if level.rank() > self.highest_difficulty.rank() {
            self.highest_difficulty = level;
        }
    }
}

// ============================================================================
// EXCHANGE
// ============================================================================

/// One question and the learner's answer to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub session_id: SessionId,
    pub exchange_number: i32,
    pub timestamp: Timestamp,
    pub question: String,
    pub difficulty_level: DifficultyLevel,
    pub student_response: Option<String>,
    pub understanding_score: i32,
    pub correct_insights: Vec<String>,
    pub misconceptions: Vec<String>,
    pub gaps: Vec<String>,
    pub hint_used: bool,
    pub hint_text: Option<String>,
}

impl Exchange {
    pub fn new(
        session_id: SessionId,
        exchange_number: i32,
        question: impl Into<String>,
        difficulty_level: DifficultyLevel,
        understanding_score: i32,
    ) -> Self {
        Self {
            session_id,
            exchange_number,
            timestamp: Utc::now(),
            question: question.into(),
            difficulty_level,
            student_response: None,
            understanding_score,
            correct_insights: Vec::new(),
            misconceptions: Vec::new(),
            gaps: Vec::new(),
            hint_used: false,
            hint_text: None,
        }
    }

    /// Exchange opened by an assistant reply, with the score and difficulty
    /// already sanitized.
    pub fn from_reply(session_id: SessionId, exchange_number: i32, reply: &StructuredReply) -> Self {
        Self::new(
            session_id,
            exchange_number,
            reply.question.clone(),
            reply.difficulty(),
            reply.clamped_score(),
        )
    }

    pub fn is_answered(&self) -> bool {
        self.student_response.is_some()
    }
}

// ============================================================================
// LEARNING STATS
// ============================================================================

/// Aggregate statistics across all sessions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_sessions: i32,
    pub total_exchanges: i32,
    pub total_learning_minutes: f64,
    pub average_understanding: f64,
    pub topics_explored: Vec<String>,
    pub streak_days: i32,
    pub last_session_date: Option<Timestamp>,
}

impl LearningStats {
    /// Fold a completed session into the aggregates.
    ///
    /// `average_understanding` is the mean final score over every ended
    /// session, computed by the store.
    pub fn record_completed_session(
        &mut self,
        session: &LearningSession,
        average_understanding: f64,
        now: Timestamp,
    ) {
        self.total_sessions += 1;
        self.total_exchanges += session.total_exchanges;
        self.total_learning_minutes += session.duration_minutes_at(now);
        self.average_understanding = average_understanding;
        if !self.topics_explored.iter().any(|t| t == &session.topic) {
            self.topics_explored.push(session.topic.clone());
        }
        self.last_session_date = Some(now);
    }

    /// Copy with minutes and average rounded to one decimal, for display.
    pub fn rounded(&self) -> Self {
        Self {
            total_learning_minutes: round1(self.total_learning_minutes),
            average_understanding: round1(self.average_understanding),
            ..self.clone()
        }
    }
}
