//! Learning Service
//!
//! Caller-facing operations over the dialogue orchestrator and a session
//! store. Each learner action runs one dialogue operation, sanitizes the
//! provider's reply and persists the result. A failed provider call leaves
//! the store as it was.

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use socratic_core::{
    clamp_score, Exchange, HintReply, LearningSession, LearningStats, SessionId, StructuredReply,
    SuggestionReply, SummaryReply, Turn,
};
use socratic_llm::{CompletionGateway, CompletionTransport, CredentialStore, DialogueOrchestrator};
use socratic_storage::{ExchangeUpdate, SessionStore, SessionUpdate};
use std::sync::Arc;

// ============================================================================
// RESPONSE TYPES
// ============================================================================

/// A freshly opened session and its first question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartedSession {
    pub session: LearningSession,
    pub reply: StructuredReply,
}

/// A session with its exchanges in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session: LearningSession,
    pub exchanges: Vec<Exchange>,
}

/// Result of ending a session. `summary` is `None` when the provider could
/// not produce one; the session is ended either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndedSession {
    pub session: LearningSession,
    pub summary: Option<SummaryReply>,
    pub stats: LearningStats,
}

/// Copy of `reply` with the score clamped to `[0, 100]` and the difficulty
/// normalized to a known level.
pub fn sanitize_reply(mut reply: StructuredReply) -> StructuredReply {
    reply.understanding_score = i64::from(reply.clamped_score());
    reply.difficulty_level = reply.difficulty().as_db_str().to_string();
    reply
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct LearningService {
    orchestrator: DialogueOrchestrator,
    store: Arc<dyn SessionStore>,
    credentials: Arc<CredentialStore>,
}

impl LearningService {
    /// `credentials` must be the store the orchestrator's gateway reads.
    pub fn new(
        orchestrator: DialogueOrchestrator,
        store: Arc<dyn SessionStore>,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            orchestrator,
            store,
            credentials,
        }
    }

    /// Wire a gateway, orchestrator and credential store from config.
    pub fn from_config(
        config: &AppConfig,
        transport: Arc<dyn CompletionTransport>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let credentials = Arc::new(match &config.api_key {
            Some(key) => CredentialStore::with_key(key.clone()),
            None => CredentialStore::new(),
        });
        let gateway = CompletionGateway::new(transport, credentials.clone(), config.gateway.clone());
        let orchestrator = DialogueOrchestrator::new(gateway).with_temperatures(config.temperatures);
        Self::new(orchestrator, store, credentials)
    }

    pub fn orchestrator(&self) -> &DialogueOrchestrator {
        &self.orchestrator
    }

    // === Credentials ===

    /// Replace the provider key; the next request uses it.
    pub fn set_api_key(&self, key: &str) -> ApiResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ApiError::invalid_input("API key is required"));
        }
        self.credentials.set(key);
        tracing::info!(configured = self.is_configured(), "Provider API key updated");
        Ok(())
    }

    pub fn clear_api_key(&self) {
        self.credentials.clear();
    }

    pub fn is_configured(&self) -> bool {
        self.orchestrator.gateway().is_configured()
    }

    // === Dialogue ===

    pub async fn start_session(&self, topic: &str, context: &str) -> ApiResult<StartedSession> {
        let topic = topic.trim();
        let context = context.trim();
        if topic.is_empty() {
            return Err(ApiError::invalid_input("Topic is required"));
        }

        let reply = sanitize_reply(self.orchestrator.begin(topic, context).await?);

        let session = LearningSession::new(topic, context, reply.clone());
        let exchange = Exchange::from_reply(session.id, 1, &reply);
        self.store.session_insert(&session)?;
        self.store.exchange_insert(&exchange)?;

        tracing::info!(
            session_id = %session.id,
            topic,
            difficulty = %reply.difficulty_level,
            "Learning session started"
        );
        Ok(StartedSession { session, reply })
    }

    /// Record the learner's answer and return the next question.
    pub async fn respond(&self, session_id: SessionId, response: &str) -> ApiResult<StructuredReply> {
        let response = response.trim();
        if response.is_empty() {
            return Err(ApiError::invalid_input("Response is required"));
        }
        let session = self.active_session(session_id)?;

        let mut transcript = session.transcript.clone();
        transcript.push(Turn::student(response));
        let reply = sanitize_reply(
            self.orchestrator
                .advance(&session.topic, &transcript, response)
                .await?,
        );
        transcript.push(Turn::assistant(reply.clone()));

        let score = reply.clamped_score();
        let difficulty = reply.difficulty();
        let mut progressed = session.clone();
        progressed.raise_difficulty(difficulty);

        self.store.session_update(
            session_id,
            SessionUpdate {
                transcript: Some(transcript),
                total_exchanges: Some(session.total_exchanges + 1),
                final_understanding_score: Some(session.final_understanding_score.max(score)),
                highest_difficulty: Some(progressed.highest_difficulty),
                ..Default::default()
            },
        )?;

        let latest = self.store.exchange_latest(session_id)?;
        if let Some(open) = latest.as_ref().filter(|exchange| !exchange.is_answered()) {
            let signals = &reply.understanding_signals;
            self.store.exchange_update(
                session_id,
                open.exchange_number,
                ExchangeUpdate {
                    student_response: Some(response.to_string()),
                    understanding_score: Some(score),
                    correct_insights: Some(signals.correct_insights.clone()),
                    misconceptions: Some(signals.misconceptions.clone()),
                    gaps: Some(signals.gaps.clone()),
                    ..Default::default()
                },
            )?;
        }
        let next_number = latest.map_or(1, |exchange| exchange.exchange_number + 1);
        self.store
            .exchange_insert(&Exchange::from_reply(session_id, next_number, &reply))?;

        tracing::info!(
            session_id = %session_id,
            exchange = next_number,
            score,
            difficulty = %difficulty,
            "Dialogue advanced"
        );
        Ok(reply)
    }

    /// Hint for the question the learner is currently on.
    pub async fn hint(&self, session_id: SessionId) -> ApiResult<HintReply> {
        let session = self.active_session(session_id)?;
        let current_question = session.transcript.current_question();

        let reply = self
            .orchestrator
            .hint(&session.topic, &session.transcript, &current_question)
            .await?;

        self.store.session_update(
            session_id,
            SessionUpdate {
                hints_used: Some(session.hints_used + 1),
                ..Default::default()
            },
        )?;
        if let Some(latest) = self.store.exchange_latest(session_id)? {
            self.store.exchange_update(
                session_id,
                latest.exchange_number,
                ExchangeUpdate {
                    hint_used: Some(true),
                    hint_text: Some(reply.hint.clone()),
                    ..Default::default()
                },
            )?;
        }

        tracing::info!(session_id = %session_id, hints_used = session.hints_used + 1, "Hint given");
        Ok(reply)
    }

    /// Summarize, close the session and fold it into the aggregate stats.
    pub async fn end_session(&self, session_id: SessionId) -> ApiResult<EndedSession> {
        let session = self.active_session(session_id)?;

        let summary = match self
            .orchestrator
            .summarize(&session.topic, &session.transcript)
            .await
        {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "Summary unavailable, ending session without it"
                );
                None
            }
        };

        let final_score = summary
            .as_ref()
            .and_then(|summary| summary.overall_understanding)
            .map(clamp_score)
            .unwrap_or(session.final_understanding_score);

        let ended = self.store.session_update(
            session_id,
            SessionUpdate {
                is_active: Some(false),
                ended_at: Some(Utc::now()),
                final_understanding_score: Some(final_score),
                summary: summary.clone(),
                ..Default::default()
            },
        )?;
        let stats = self.store.stats_record_session_end(&ended)?.rounded();

        tracing::info!(
            session_id = %session_id,
            final_score,
            exchanges = ended.total_exchanges,
            minutes = ended.duration_minutes(),
            "Learning session ended"
        );
        Ok(EndedSession {
            session: ended,
            summary,
            stats,
        })
    }

    pub async fn suggest_topics(&self, interests: &str) -> ApiResult<SuggestionReply> {
        Ok(self.orchestrator.suggest(interests.trim()).await?)
    }

    // === Records ===

    pub fn get_session(&self, session_id: SessionId) -> ApiResult<SessionDetail> {
        let session = self.session(session_id)?;
        let exchanges = self.store.exchange_list(session_id)?;
        Ok(SessionDetail { session, exchanges })
    }

    /// All sessions, most recently started first.
    pub fn list_sessions(&self) -> ApiResult<Vec<LearningSession>> {
        Ok(self.store.session_list()?)
    }

    pub fn delete_session(&self, session_id: SessionId) -> ApiResult<()> {
        self.store.session_delete(session_id)?;
        tracing::info!(session_id = %session_id, "Learning session deleted");
        Ok(())
    }

    /// Aggregate stats with minutes and average rounded for display.
    pub fn get_stats(&self) -> ApiResult<LearningStats> {
        Ok(self.store.stats_get()?.rounded())
    }

    fn session(&self, session_id: SessionId) -> ApiResult<LearningSession> {
        self.store
            .session_get(session_id)?
            .ok_or_else(|| ApiError::session_not_found(session_id))
    }

    fn active_session(&self, session_id: SessionId) -> ApiResult<LearningSession> {
        let session = self.session(session_id)?;
        if !session.is_active {
            return Err(ApiError::state_conflict(format!(
                "Session {} has already ended",
                session_id
            )));
        }
        Ok(session)
    }
}

impl std::fmt::Debug for LearningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningService")
            .field("orchestrator", &self.orchestrator)
            .field("credentials", &self.credentials)
            .finish()
    }
}
