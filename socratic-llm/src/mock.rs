//! Mock transport and sleeper for tests
//!
//! Kept in the library (not behind `cfg(test)`) so integration tests and
//! downstream crates can script provider behaviour.

use crate::gateway::Sleeper;
use crate::providers::openai::extract_chat_content;
use crate::{CompletionRequest, CompletionTransport, RawResponse, TransportError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Wrap reply text in an OpenAI-style chat completion body.
pub fn chat_completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-mock",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

/// One scripted transport result.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    Response(RawResponse),
    Timeout,
    NetworkError(String),
}

impl ScriptedReply {
    /// HTTP 200 whose message content is `content`.
    pub fn content(content: &str) -> Self {
        Self::Response(RawResponse::new(200, chat_completion_body(content)))
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Response(RawResponse::new(status, body))
    }

    pub fn rate_limited() -> Self {
        Self::status(
            429,
            r#"{"error":{"message":"Rate limit exceeded: free-models-per-min","code":429}}"#,
        )
    }
}

/// Transport that replays per-model scripts and records every request.
///
/// Each model has a queue of replies consumed in order; once a queue is
/// empty the model's repeat reply (if any) is returned forever. Models with
/// neither answer with a network error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    queues: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    repeats: Mutex<HashMap<String, ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for `model`.
    pub fn script(self, model: &str, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        lock(&self.queues)
            .entry(model.to_string())
            .or_default()
            .extend(replies);
        self
    }

    /// Reply used for `model` whenever its queue is empty.
    pub fn repeat(self, model: &str, reply: ScriptedReply) -> Self {
        lock(&self.repeats).insert(model.to_string(), reply);
        self
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Models in the order they were tried, one entry per request.
    pub fn models_tried(&self) -> Vec<String> {
        lock(&self.requests).iter().map(|r| r.model.clone()).collect()
    }

    fn next_reply(&self, model: &str) -> ScriptedReply {
        if let Some(reply) = lock(&self.queues).get_mut(model).and_then(VecDeque::pop_front) {
            return reply;
        }
        lock(&self.repeats)
            .get(model)
            .cloned()
            .unwrap_or_else(|| ScriptedReply::NetworkError(format!("no script for {}", model)))
    }
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(
        &self,
        _credential: &str,
        request: &CompletionRequest,
    ) -> Result<RawResponse, TransportError> {
        lock(&self.requests).push(request.clone());
        match self.next_reply(&request.model) {
            ScriptedReply::Response(response) => Ok(response),
            ScriptedReply::Timeout => Err(TransportError::Timeout(Duration::from_secs(30))),
            ScriptedReply::NetworkError(message) => Err(TransportError::Network(message)),
        }
    }

    fn extract_content(&self, body: &str) -> Result<String, String> {
        extract_chat_content(body)
    }
}

/// Sleeper that records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        lock(&self.delays).clone()
    }

    pub fn count(&self) -> usize {
        lock(&self.delays).len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.delays).push(duration);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
