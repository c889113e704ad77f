//! In-memory session store

use crate::{ExchangeUpdate, SessionStore, SessionUpdate};
use chrono::Utc;
use socratic_core::{
    Exchange, LearningSession, LearningStats, RecordKind, SessionId, SocraticResult, StorageError,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Process-local store backed by `RwLock`ed maps. Clones share state.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    sessions: Arc<RwLock<HashMap<SessionId, LearningSession>>>,
    exchanges: Arc<RwLock<HashMap<SessionId, Vec<Exchange>>>>,
    stats: Arc<RwLock<LearningStats>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges
            .read()
            .map(|e| e.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StorageError> {
    lock.read().map_err(|_| StorageError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StorageError> {
    lock.write().map_err(|_| StorageError::LockPoisoned)
}

fn not_found(kind: RecordKind, id: SessionId) -> StorageError {
    StorageError::NotFound { kind, id }
}

impl SessionStore for InMemoryStore {
    // === Session Operations ===

    fn session_insert(&self, session: &LearningSession) -> SocraticResult<()> {
        let mut sessions = write(&self.sessions)?;
        if sessions.contains_key(&session.id) {
            return Err(StorageError::AlreadyExists {
                kind: RecordKind::Session,
                id: session.id,
            }
            .into());
        }
        sessions.insert(session.id, session.clone());
        tracing::debug!(session_id = %session.id, topic = %session.topic, "Session stored");
        Ok(())
    }

    fn session_get(&self, id: SessionId) -> SocraticResult<Option<LearningSession>> {
        Ok(read(&self.sessions)?.get(&id).cloned())
    }

    fn session_update(
        &self,
        id: SessionId,
        update: SessionUpdate,
    ) -> SocraticResult<LearningSession> {
        let mut sessions = write(&self.sessions)?;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| not_found(RecordKind::Session, id))?;

        if let Some(is_active) = update.is_active {
            session.is_active = is_active;
        }
        if let Some(ended_at) = update.ended_at {
            session.ended_at = Some(ended_at);
        }
        if let Some(total) = update.total_exchanges {
            session.total_exchanges = total;
        }
        if let Some(score) = update.final_understanding_score {
            session.final_understanding_score = score;
        }
        if let Some(level) = update.highest_difficulty {
            session.highest_difficulty = level;
        }
        if let Some(hints) = update.hints_used {
            session.hints_used = hints;
        }
        if let Some(summary) = update.summary {
            session.summary = Some(summary);
        }
        if let Some(transcript) = update.transcript {
            session.transcript = transcript;
        }

        Ok(session.clone())
    }

    fn session_list(&self) -> SocraticResult<Vec<LearningSession>> {
        let mut sessions: Vec<LearningSession> = read(&self.sessions)?.values().cloned().collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    fn session_delete(&self, id: SessionId) -> SocraticResult<()> {
        let mut sessions = write(&self.sessions)?;
        if sessions.remove(&id).is_none() {
            return Err(not_found(RecordKind::Session, id).into());
        }
        write(&self.exchanges)?.remove(&id);
        tracing::debug!(session_id = %id, "Session deleted");
        Ok(())
    }

    // === Exchange Operations ===

    fn exchange_insert(&self, exchange: &Exchange) -> SocraticResult<()> {
        // Held until the write lands so a concurrent delete cannot orphan it.
        let sessions = read(&self.sessions)?;
        if !sessions.contains_key(&exchange.session_id) {
            return Err(not_found(RecordKind::Session, exchange.session_id).into());
        }
        let mut exchanges = write(&self.exchanges)?;
        let list = exchanges.entry(exchange.session_id).or_default();
        if list
            .iter()
            .any(|e| e.exchange_number == exchange.exchange_number)
        {
            return Err(StorageError::AlreadyExists {
                kind: RecordKind::Exchange,
                id: exchange.session_id,
            }
            .into());
        }
        list.push(exchange.clone());
        list.sort_by_key(|e| e.exchange_number);
        Ok(())
    }

    fn exchange_latest(&self, session_id: SessionId) -> SocraticResult<Option<Exchange>> {
        Ok(read(&self.exchanges)?
            .get(&session_id)
            .and_then(|list| list.iter().max_by_key(|e| e.exchange_number))
            .cloned())
    }

    fn exchange_update(
        &self,
        session_id: SessionId,
        exchange_number: i32,
        update: ExchangeUpdate,
    ) -> SocraticResult<()> {
        let mut exchanges = write(&self.exchanges)?;
        let exchange = exchanges
            .get_mut(&session_id)
            .and_then(|list| list.iter_mut().find(|e| e.exchange_number == exchange_number))
            .ok_or_else(|| not_found(RecordKind::Exchange, session_id))?;

        if let Some(response) = update.student_response {
            exchange.student_response = Some(response);
        }
        if let Some(score) = update.understanding_score {
            exchange.understanding_score = score;
        }
        if let Some(insights) = update.correct_insights {
            exchange.correct_insights = insights;
        }
        if let Some(misconceptions) = update.misconceptions {
            exchange.misconceptions = misconceptions;
        }
        if let Some(gaps) = update.gaps {
            exchange.gaps = gaps;
        }
        if let Some(hint_used) = update.hint_used {
            exchange.hint_used = hint_used;
        }
        if let Some(hint_text) = update.hint_text {
            exchange.hint_text = Some(hint_text);
        }
        Ok(())
    }

    fn exchange_list(&self, session_id: SessionId) -> SocraticResult<Vec<Exchange>> {
        Ok(read(&self.exchanges)?
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    // === Stats Operations ===

    fn stats_get(&self) -> SocraticResult<LearningStats> {
        Ok(read(&self.stats)?.clone())
    }

    fn stats_record_session_end(
        &self,
        session: &LearningSession,
    ) -> SocraticResult<LearningStats> {
        let average = {
            let sessions = read(&self.sessions)?;
            let scores: Vec<f64> = sessions
                .values()
                .filter(|s| !s.is_active)
                .map(|s| f64::from(s.final_understanding_score))
                .collect();
            if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            }
        };

        let mut stats = write(&self.stats)?;
        stats.record_completed_session(session, average, Utc::now());
        tracing::debug!(
            total_sessions = stats.total_sessions,
            average_understanding = stats.average_understanding,
            "Learning stats updated"
        );
        Ok(stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socratic_core::{DifficultyLevel, SocraticError, StructuredReply, SummaryReply, Turn};

    fn make_session(topic: &str) -> LearningSession {
        LearningSession::new(
            topic,
            "",
            StructuredReply {
                question: format!("What do you know about {}?", topic),
                ..Default::default()
            },
        )
    }

    fn make_exchange(session_id: SessionId, number: i32) -> Exchange {
        Exchange::new(
            session_id,
            number,
            format!("Question {}", number),
            DifficultyLevel::Foundational,
            0,
        )
    }

    // ========================================================================
    // Session Tests
    // ========================================================================

    #[test]
    fn test_session_insert_get() {
        let store = InMemoryStore::new();
        let session = make_session("Optics");

        store.session_insert(&session).unwrap();
        let retrieved = store.session_get(session.id).unwrap();

        assert_eq!(retrieved, Some(session));
    }

    #[test]
    fn test_session_insert_duplicate() {
        let store = InMemoryStore::new();
        let session = make_session("Optics");

        store.session_insert(&session).unwrap();
        let result = store.session_insert(&session);

        assert!(matches!(
            result,
            Err(SocraticError::Storage(StorageError::AlreadyExists { .. }))
        ));
    }

    #[test]
    fn test_session_update_partial() {
        let store = InMemoryStore::new();
        let session = make_session("Optics");
        store.session_insert(&session).unwrap();

        let mut transcript = session.transcript.clone();
        transcript.push(Turn::student("Light bends"));
        let updated = store
            .session_update(
                session.id,
                SessionUpdate {
                    hints_used: Some(2),
                    transcript: Some(transcript),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.hints_used, 2);
        assert_eq!(updated.transcript.len(), 2);
        assert!(updated.is_active);
        assert_eq!(updated.topic, "Optics");
    }

    #[test]
    fn test_session_update_missing() {
        let store = InMemoryStore::new();
        let result = store.session_update(uuid::Uuid::now_v7(), SessionUpdate::default());
        assert!(matches!(
            result,
            Err(SocraticError::Storage(StorageError::NotFound {
                kind: RecordKind::Session,
                ..
            }))
        ));
    }

    #[test]
    fn test_session_list_most_recent_first() {
        let store = InMemoryStore::new();
        let mut older = make_session("History");
        older.started_at = Utc::now() - chrono::Duration::hours(2);
        let newer = make_session("Chemistry");

        store.session_insert(&older).unwrap();
        store.session_insert(&newer).unwrap();

        let topics: Vec<String> = store
            .session_list()
            .unwrap()
            .into_iter()
            .map(|s| s.topic)
            .collect();
        assert_eq!(topics, vec!["Chemistry".to_string(), "History".to_string()]);
    }

    #[test]
    fn test_session_delete_removes_exchanges() {
        let store = InMemoryStore::new();
        let session = make_session("Optics");
        store.session_insert(&session).unwrap();
        store.exchange_insert(&make_exchange(session.id, 1)).unwrap();

        store.session_delete(session.id).unwrap();

        assert_eq!(store.session_count(), 0);
        assert_eq!(store.exchange_count(), 0);
        assert!(store.session_delete(session.id).is_err());
    }

    // ========================================================================
    // Exchange Tests
    // ========================================================================

    #[test]
    fn test_exchange_requires_session() {
        let store = InMemoryStore::new();
        let result = store.exchange_insert(&make_exchange(uuid::Uuid::now_v7(), 1));
        assert!(result.is_err());
    }

    #[test]
    fn test_concurrent_delete_leaves_no_orphan_exchanges() {
        let store = InMemoryStore::new();
        let ids: Vec<SessionId> = (0..64)
            .map(|i| {
                let session = make_session(&format!("Topic {}", i));
                store.session_insert(&session).unwrap();
                session.id
            })
            .collect();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for id in &ids {
                    for number in 1..=4 {
                        let _ = store.exchange_insert(&make_exchange(*id, number));
                    }
                }
            });
            scope.spawn(|| {
                for id in &ids {
                    store.session_delete(*id).unwrap();
                }
            });
        });

        assert_eq!(store.session_count(), 0);
        assert_eq!(store.exchange_count(), 0);
    }

    #[test]
    fn test_exchange_latest_and_update() {
        let store = InMemoryStore::new();
        let session = make_session("Optics");
        store.session_insert(&session).unwrap();
        store.exchange_insert(&make_exchange(session.id, 2)).unwrap();
        store.exchange_insert(&make_exchange(session.id, 1)).unwrap();

        let latest = store.exchange_latest(session.id).unwrap().unwrap();
        assert_eq!(latest.exchange_number, 2);

        store
            .exchange_update(
                session.id,
                2,
                ExchangeUpdate {
                    hint_used: Some(true),
                    hint_text: Some("Think of a prism".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let list = store.exchange_list(session.id).unwrap();
        assert_eq!(
            list.iter().map(|e| e.exchange_number).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(list[1].hint_used);
        assert_eq!(list[1].hint_text.as_deref(), Some("Think of a prism"));
        assert!(!list[0].hint_used);
    }

    #[test]
    fn test_exchange_duplicate_number_rejected() {
        let store = InMemoryStore::new();
        let session = make_session("Optics");
        store.session_insert(&session).unwrap();
        store.exchange_insert(&make_exchange(session.id, 1)).unwrap();
        assert!(store.exchange_insert(&make_exchange(session.id, 1)).is_err());
    }

    // ========================================================================
    // Stats Tests
    // ========================================================================

    #[test]
    fn test_stats_average_over_ended_sessions() {
        let store = InMemoryStore::new();

        for (topic, score) in [("Optics", 60), ("Optics", 80)] {
            let session = make_session(topic);
            store.session_insert(&session).unwrap();
            let ended = store
                .session_update(
                    session.id,
                    SessionUpdate {
                        is_active: Some(false),
                        ended_at: Some(Utc::now()),
                        final_understanding_score: Some(score),
                        total_exchanges: Some(3),
                        summary: Some(SummaryReply::default()),
                        ..Default::default()
                    },
                )
                .unwrap();
            store.stats_record_session_end(&ended).unwrap();
        }

        let active = make_session("Biology");
        store.session_insert(&active).unwrap();

        let stats = store.stats_get().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_exchanges, 6);
        assert_eq!(stats.average_understanding, 70.0);
        assert_eq!(stats.topics_explored, vec!["Optics".to_string()]);
        assert!(stats.last_session_date.is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let store = InMemoryStore::new();
        let clone = store.clone();
        clone.session_insert(&make_session("Optics")).unwrap();
        assert_eq!(store.session_count(), 1);
    }
}
