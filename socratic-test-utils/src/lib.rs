//! Socratic Test Utilities
//!
//! Shared test infrastructure for the Socratic workspace:
//! - Proptest generators for dialogue and session types
//! - JSON fixtures shaped like real provider replies
//! - Assertions for invariants the learning service must keep

// Re-export the in-memory store from its source crate
pub use socratic_storage::InMemoryStore;

// Re-export core types for convenience
pub use socratic_core::{
    DifficultyLevel, Exchange, LearningSession, LearningStats, RetryConfig, Role,
    StructuredReply, SummaryReply, Transcript, Turn, TurnContent, UnderstandingSignals,
};

use chrono::Utc;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Socratic types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a valid UUIDv7 (timestamp-sortable).
    pub fn arb_uuid_v7() -> impl Strategy<Value = Uuid> {
        Just(()).prop_map(|_| Uuid::now_v7())
    }

    /// Single-line prose without separators used by prompt rendering.
    pub fn arb_prose() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 .,!?']{1,80}"
    }

    pub fn arb_difficulty_level() -> impl Strategy<Value = DifficultyLevel> {
        prop_oneof![
            Just(DifficultyLevel::Foundational),
            Just(DifficultyLevel::Intermediate),
            Just(DifficultyLevel::Advanced),
            Just(DifficultyLevel::Mastery),
        ]
    }

    /// Difficulty strings as a provider might send them, valid or not.
    pub fn arb_difficulty_text() -> impl Strategy<Value = String> {
        prop_oneof![
            arb_difficulty_level().prop_map(|d| d.as_db_str().to_string()),
            arb_difficulty_level().prop_map(|d| d.as_db_str().to_uppercase()),
            "[a-z]{0,12}",
        ]
    }

    pub fn arb_signals() -> impl Strategy<Value = UnderstandingSignals> {
        (
            prop::collection::vec(arb_prose(), 0..3),
            prop::collection::vec(arb_prose(), 0..3),
            prop::collection::vec(arb_prose(), 0..3),
        )
            .prop_map(|(correct_insights, misconceptions, gaps)| UnderstandingSignals {
                correct_insights,
                misconceptions,
                gaps,
            })
    }

    /// Structured reply with scores that may fall outside `[0, 100]`.
    pub fn arb_structured_reply() -> impl Strategy<Value = StructuredReply> {
        (
            arb_prose(),
            arb_signals(),
            -50i64..200,
            arb_difficulty_text(),
            any::<bool>(),
        )
            .prop_map(
                |(question, understanding_signals, understanding_score, difficulty_level, hint_available)| {
                    StructuredReply {
                        question,
                        thinking: String::new(),
                        understanding_signals,
                        understanding_score,
                        difficulty_level,
                        hint_available,
                        encouragement: String::new(),
                    }
                },
            )
    }

    pub fn arb_turn() -> impl Strategy<Value = Turn> {
        prop_oneof![
            arb_structured_reply().prop_map(Turn::assistant),
            arb_prose().prop_map(|text| Turn::assistant_text(text)),
            arb_prose().prop_map(|text| Turn::student(text)),
        ]
    }

    /// Transcript of up to `max_turns` turns.
    pub fn arb_transcript(max_turns: usize) -> impl Strategy<Value = Transcript> {
        prop::collection::vec(arb_turn(), 0..=max_turns).prop_map(Transcript::from)
    }

    /// Generate a RetryConfig that passes validation.
    pub fn arb_retry_config() -> impl Strategy<Value = RetryConfig> {
        (1u32..6, 1u64..5_000, 1.0f64..4.0, 1u64..5_000).prop_map(
            |(max_retries, base_ms, backoff_multiplier, timeout_ms)| RetryConfig {
                max_retries,
                base_backoff: Duration::from_millis(base_ms),
                backoff_multiplier,
                timeout_backoff: Duration::from_millis(timeout_ms),
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Provider reply bodies and pre-built records.

    use super::*;
    use serde_json::json;

    /// Reply content for a dialogue turn.
    pub fn question_json(question: &str, score: i64, difficulty: &str) -> String {
        json!({
            "question": question,
            "thinking": "Checking the learner's baseline",
            "understanding_signals": {
                "correct_insights": ["Knows plants need sunlight"],
                "misconceptions": ["Thinks plants eat soil"],
                "gaps": ["Role of carbon dioxide"]
            },
            "understanding_score": score,
            "difficulty_level": difficulty,
            "hint_available": true,
            "encouragement": "Good start!"
        })
        .to_string()
    }

    /// Same as [`question_json`], wrapped in a markdown fence.
    pub fn fenced_question_json(question: &str, score: i64, difficulty: &str) -> String {
        format!("```json\n{}\n```", question_json(question, score, difficulty))
    }

    pub fn hint_json(hint: &str) -> String {
        json!({ "hint": hint }).to_string()
    }

    pub fn summary_json(overall_understanding: i64) -> String {
        json!({
            "topic_summary": "Explored how plants turn light into chemical energy.",
            "key_discoveries": ["Light drives the reaction"],
            "misconceptions_addressed": ["Plants do not eat soil"],
            "remaining_gaps": ["The Calvin cycle"],
            "overall_understanding": overall_understanding,
            "recommended_next_topics": ["Cellular respiration"],
            "learning_style_notes": "Learns well from analogies.",
            "time_well_spent_score": 85
        })
        .to_string()
    }

    pub fn suggestions_json() -> String {
        json!({
            "suggestions": [
                {"topic": "Entropy", "description": "Why time has a direction", "category": "physics", "difficulty": "advanced"},
                {"topic": "Game theory", "description": "When cooperation beats betrayal", "category": "mathematics", "difficulty": "intermediate"},
                {"topic": "The printing press", "description": "One machine that rewired Europe", "category": "history", "difficulty": "beginner"}
            ]
        })
        .to_string()
    }

    /// Active session with one opening question.
    pub fn active_session(topic: &str) -> LearningSession {
        LearningSession::new(
            topic,
            "",
            StructuredReply {
                question: format!("What do you already know about {}?", topic),
                difficulty_level: "foundational".to_string(),
                ..Default::default()
            },
        )
    }

    /// Ended session, started ten minutes before it ended.
    pub fn completed_session(topic: &str, final_score: i32) -> LearningSession {
        let mut session = active_session(topic);
        let ended_at = Utc::now();
        session.started_at = ended_at - chrono::Duration::minutes(10);
        session.ended_at = Some(ended_at);
        session.is_active = false;
        session.total_exchanges = 3;
        session.final_understanding_score = final_score;
        session
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Checks for invariants the learning service must keep.

    use super::*;

    /// Every stored score is within `[0, 100]`.
    pub fn assert_scores_in_range(session: &LearningSession, exchanges: &[Exchange]) {
        assert!(
            (0..=100).contains(&session.final_understanding_score),
            "session score out of range: {}",
            session.final_understanding_score
        );
        for exchange in exchanges {
            assert!(
                (0..=100).contains(&exchange.understanding_score),
                "exchange {} score out of range: {}",
                exchange.exchange_number,
                exchange.understanding_score
            );
        }
    }

    /// Exchanges are numbered 1..=n without gaps.
    pub fn assert_exchanges_numbered(exchanges: &[Exchange]) {
        for (index, exchange) in exchanges.iter().enumerate() {
            assert_eq!(
                exchange.exchange_number,
                index as i32 + 1,
                "exchange numbering has a gap at position {}",
                index
            );
        }
    }
}
