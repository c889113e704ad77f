//! Dialogue orchestration
//!
//! One method per learning interaction. Each assembles its prompt, runs it
//! through the gateway and hands back the decoded reply unvalidated; score
//! clamping and difficulty normalisation belong to the caller.

use crate::gateway::CompletionGateway;
use crate::prompts::{AssembledPrompt, PromptAssembler};
use serde::de::DeserializeOwned;
use socratic_core::{
    CompletionOutcome, HintReply, StructuredReply, SuggestionReply, SummaryReply,
    TemperatureProfile, Transcript,
};

#[derive(Debug)]
pub struct DialogueOrchestrator {
    gateway: CompletionGateway,
    prompts: PromptAssembler,
}

impl DialogueOrchestrator {
    pub fn new(gateway: CompletionGateway) -> Self {
        Self {
            gateway,
            prompts: PromptAssembler::default(),
        }
    }

    pub fn with_temperatures(mut self, temperatures: TemperatureProfile) -> Self {
        self.prompts = PromptAssembler::new(temperatures);
        self
    }

    pub fn gateway(&self) -> &CompletionGateway {
        &self.gateway
    }

    pub fn prompts(&self) -> &PromptAssembler {
        &self.prompts
    }

    /// First question for a new topic.
    pub async fn begin(&self, topic: &str, context: &str) -> CompletionOutcome<StructuredReply> {
        self.run(self.prompts.start(topic, context)).await
    }

    /// Next question after `student_response`.
    ///
    /// `transcript` is the history as the caller holds it, normally already
    /// ending with the student's turn.
    pub async fn advance(
        &self,
        topic: &str,
        transcript: &Transcript,
        student_response: &str,
    ) -> CompletionOutcome<StructuredReply> {
        self.run(
            self.prompts
                .continue_dialogue(topic, transcript, student_response),
        )
        .await
    }

    pub async fn hint(
        &self,
        topic: &str,
        transcript: &Transcript,
        current_question: &str,
    ) -> CompletionOutcome<HintReply> {
        self.run(self.prompts.hint(topic, transcript, current_question))
            .await
    }

    pub async fn summarize(
        &self,
        topic: &str,
        transcript: &Transcript,
    ) -> CompletionOutcome<SummaryReply> {
        self.run(self.prompts.summary(topic, transcript)).await
    }

    pub async fn suggest(&self, interests: &str) -> CompletionOutcome<SuggestionReply> {
        self.run(self.prompts.suggestions(interests)).await
    }

    async fn run<T: DeserializeOwned>(&self, prompt: AssembledPrompt) -> CompletionOutcome<T> {
        tracing::debug!(
            operation = prompt.kind.as_str(),
            temperature = prompt.temperature as f64,
            prompt_chars = prompt.user.len(),
            "Running dialogue operation"
        );
        let outcome = self
            .gateway
            .complete(&prompt.system, &prompt.user, prompt.temperature)
            .await;
        if let Err(e) = &outcome {
            tracing::warn!(operation = prompt.kind.as_str(), error = %e, "Dialogue operation failed");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{RecordingSleeper, ScriptedReply, ScriptedTransport};
    use crate::prompts::{HINT_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT};
    use crate::CredentialStore;
    use socratic_core::{GatewayConfig, GatewayErrorKind, Turn};
    use std::sync::Arc;

    const MODEL: &str = "primary";

    fn orchestrator(transport: Arc<ScriptedTransport>) -> DialogueOrchestrator {
        let config = GatewayConfig {
            models: vec![MODEL.to_string()],
            ..GatewayConfig::default()
        };
        let gateway = CompletionGateway::new(
            transport,
            Arc::new(CredentialStore::with_key("sk-test")),
            config,
        )
        .with_sleeper(Arc::new(RecordingSleeper::new()));
        DialogueOrchestrator::new(gateway)
    }

    #[tokio::test]
    async fn test_begin_returns_structured_reply() {
        let transport = Arc::new(ScriptedTransport::new().script(
            MODEL,
            [ScriptedReply::content(
                r#"{"question":"What is energy?","difficulty_level":"foundational","understanding_score":0}"#,
            )],
        ));
        let reply = orchestrator(transport.clone())
            .begin("Thermodynamics", "")
            .await
            .unwrap();
        assert_eq!(reply.question, "What is energy?");

        let request = &transport.requests()[0];
        assert!(request.user_text().contains("Thermodynamics"));
        assert_eq!(request.temperature, 0.7);
    }

    #[tokio::test]
    async fn test_hint_and_summary_use_their_prompts() {
        let transport = Arc::new(
            ScriptedTransport::new().script(
                MODEL,
                [
                    ScriptedReply::content(r#"{"hint":"Think about friction"}"#),
                    ScriptedReply::content(r#"{"topic_summary":"Motion","overall_understanding":72}"#),
                ],
            ),
        );
        let orchestrator = orchestrator(transport.clone());
        let transcript: Transcript = vec![
            Turn::assistant_text("Why does a ball stop rolling?"),
            Turn::student("It runs out of push"),
        ]
        .into();

        let hint = orchestrator
            .hint("Motion", &transcript, "Why does a ball stop rolling?")
            .await
            .unwrap();
        assert_eq!(hint.hint, "Think about friction");

        let summary = orchestrator.summarize("Motion", &transcript).await.unwrap();
        assert_eq!(summary.overall_understanding, Some(72));

        let requests = transport.requests();
        assert_eq!(requests[0].system_text().as_deref(), Some(HINT_SYSTEM_PROMPT));
        assert_eq!(requests[1].system_text().as_deref(), Some(SUMMARY_SYSTEM_PROMPT));
        assert_eq!(requests[1].temperature, 0.5);
    }

    #[tokio::test]
    async fn test_suggest_uses_high_temperature() {
        let transport = Arc::new(ScriptedTransport::new().script(
            MODEL,
            [ScriptedReply::content(
                r#"{"suggestions":[{"topic":"Entropy","description":"Why time has a direction","category":"physics","difficulty":"advanced"}]}"#,
            )],
        ));
        let reply = orchestrator(transport.clone()).suggest("").await.unwrap();
        assert_eq!(reply.suggestions.len(), 1);
        assert_eq!(reply.suggestions[0].topic, "Entropy");
        assert_eq!(transport.requests()[0].temperature, 0.9);
    }

    #[tokio::test]
    async fn test_advance_propagates_malformed() {
        let transport = Arc::new(
            ScriptedTransport::new().script(MODEL, [ScriptedReply::content("I think you should...")]),
        );
        let err = orchestrator(transport)
            .advance("Motion", &Transcript::new(), "no idea")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), GatewayErrorKind::MalformedResponse);
    }
}
