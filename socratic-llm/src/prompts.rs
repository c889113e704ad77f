//! Prompt assembly
//!
//! Pure functions from (topic, transcript, latest input) to the system and
//! user text of one completion request. Nothing here touches the network.

use socratic_core::{Role, TemperatureProfile, Transcript, Turn, TurnContent};

/// Number of trailing turns shown to the hint prompt.
pub const HINT_HISTORY_TURNS: usize = 6;

/// Number of topics requested from the suggestion prompt.
pub const SUGGESTION_COUNT: usize = 6;

pub const SOCRATIC_SYSTEM_PROMPT: &str = r#"You are Socratic, a learning companion that never hands out answers.
You teach with the Socratic method: every reply is a carefully chosen question that moves the student toward understanding on their own.

## RULES
1. Never answer the student's question or explain the concept outright.
2. Always reply with one guiding question that brings the student closer to understanding.
3. When the student shows a correct insight, acknowledge it briefly and go deeper with a harder question.
4. When the student shows a misconception, probe it with a question that exposes the flaw.
5. When the student is stuck, break the problem into a simpler sub-question.
6. Keep track of how well the student understands the topic as the dialogue goes on.

## RESPONSE FORMAT (strict JSON)
{
    "question": "Your Socratic question to the student",
    "thinking": "Short private reasoning about the student's current understanding",
    "understanding_signals": {
        "correct_insights": ["correct things the student has shown"],
        "misconceptions": ["misconceptions you detected"],
        "gaps": ["knowledge gaps still to explore"]
    },
    "understanding_score": 0,
    "difficulty_level": "foundational",
    "hint_available": true,
    "encouragement": "One short sentence of encouragement"
}

understanding_score is an integer from 0 to 100.
difficulty_level is one of: foundational, intermediate, advanced, mastery.

## DIFFICULTY LEVELS
- foundational: recall and definitions
- intermediate: application and analysis
- advanced: synthesis and evaluation
- mastery: transfer to unfamiliar contexts

## BEHAVIOUR
- Open with foundational questions to find the student's baseline.
- Raise the difficulty as the student demonstrates understanding; after three or more good answers at a level, move up.
- When the student struggles, step down to simpler sub-questions.
- Be warm and intellectually rigorous. Keep questions short and focused.
- Build on the student's earlier answers.
"#;

pub const HINT_SYSTEM_PROMPT: &str = r#"You are giving a HINT, not an answer, to a student who is stuck.
A good hint:
1. Points in the right direction without revealing the answer
2. Connects to something the student probably already knows
3. Offers an analogy or a simpler related idea
4. Is one or two sentences long

Respond with valid JSON only: {"hint": "your hint text"}
"#;

pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You are summarizing a Socratic learning session.
Read the whole conversation and produce a learning summary.

Respond with valid JSON only:
{
    "topic_summary": "What the session covered (2-3 sentences)",
    "key_discoveries": ["What the student worked out through questioning"],
    "misconceptions_addressed": ["Misconceptions that surfaced and were corrected"],
    "remaining_gaps": ["Areas that still need exploring"],
    "overall_understanding": 0,
    "recommended_next_topics": ["Topics to explore next"],
    "learning_style_notes": "How this student seems to learn best (1-2 sentences)",
    "time_well_spent_score": 0
}

overall_understanding and time_well_spent_score are integers from 0 to 100.
"#;

pub const SUGGESTION_SYSTEM_PROMPT: &str =
    "You suggest fascinating learning topics. Respond with valid JSON only.";

const SUGGESTION_SHAPE: &str = r#"
Respond with valid JSON:
{
    "suggestions": [
        {"topic": "topic name", "description": "One-line hook that makes it intriguing", "category": "category", "difficulty": "beginner|intermediate|advanced"}
    ]
}"#;

/// Which orchestration operation a prompt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Start,
    Continue,
    Hint,
    Summary,
    Suggestions,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Continue => "continue",
            Self::Hint => "hint",
            Self::Summary => "summary",
            Self::Suggestions => "suggestions",
        }
    }
}

/// System text, user text and sampling temperature for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPrompt {
    pub kind: PromptKind,
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Builds the prompt for each orchestration operation.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    temperatures: TemperatureProfile,
}

impl PromptAssembler {
    pub fn new(temperatures: TemperatureProfile) -> Self {
        Self { temperatures }
    }

    pub fn temperatures(&self) -> &TemperatureProfile {
        &self.temperatures
    }

    /// Opening question for a new topic.
    pub fn start(&self, topic: &str, context: &str) -> AssembledPrompt {
        let context = if context.trim().is_empty() {
            "None provided"
        } else {
            context
        };
        let user = format!(
            "A student wants to learn about: {topic}\n\n\
             Additional context from the student: {context}\n\n\
             Begin the Socratic dialogue. Start with a foundational question to gauge their \
             current understanding of this topic. Remember: do NOT explain the topic - ask a \
             question that reveals what they already know."
        );
        self.assemble(PromptKind::Start, SOCRATIC_SYSTEM_PROMPT, user)
    }

    /// Next question after the student's latest response.
    ///
    /// The whole transcript is rendered, one line per turn, followed by the
    /// latest response and the analysis instruction.
    pub fn continue_dialogue(
        &self,
        topic: &str,
        transcript: &Transcript,
        student_response: &str,
    ) -> AssembledPrompt {
        let mut lines = Vec::with_capacity(transcript.len() + 3);
        lines.push(format!("Topic being explored: {}\n", topic));
        for turn in transcript.iter() {
            lines.push(match turn.role {
                Role::Assistant => format!("Socratic (you previously asked): {}", turn.display_text()),
                Role::Student => format!("Student responded: {}", turn.display_text()),
            });
        }
        lines.push(format!("\nStudent's latest response: {}", student_response));
        lines.push(
            "\nAnalyze their response for understanding, misconceptions, and gaps. Then ask your \
             next Socratic question. Remember: NEVER give the answer directly. Respond with valid \
             JSON only."
                .to_string(),
        );
        self.assemble(PromptKind::Continue, SOCRATIC_SYSTEM_PROMPT, lines.join("\n"))
    }

    /// Hint for the current question, with only the recent turns as context.
    pub fn hint(
        &self,
        topic: &str,
        transcript: &Transcript,
        current_question: &str,
    ) -> AssembledPrompt {
        let mut user = format!(
            "Topic: {}\nCurrent question the student is stuck on: {}\n\nRecent conversation:\n",
            topic, current_question
        );
        for turn in transcript.last_n(HINT_HISTORY_TURNS) {
            user.push_str(speaker(turn));
            user.push_str(": ");
            user.push_str(turn.display_text());
            user.push('\n');
        }
        user.push_str("\nProvide a helpful hint. Respond with valid JSON only.");
        self.assemble(PromptKind::Hint, HINT_SYSTEM_PROMPT, user)
    }

    /// End-of-session summary over the full transcript.
    pub fn summary(&self, topic: &str, transcript: &Transcript) -> AssembledPrompt {
        let mut user = format!("Topic: {}\n\nFull conversation:\n", topic);
        for turn in transcript.iter() {
            user.push_str(speaker(turn));
            user.push_str(": ");
            user.push_str(&summary_text(turn));
            user.push('\n');
        }
        user.push_str(
            "\n\nProvide a comprehensive learning session summary. Respond with valid JSON only.",
        );
        self.assemble(PromptKind::Summary, SUMMARY_SYSTEM_PROMPT, user)
    }

    /// Topic suggestions, optionally steered by the learner's interests.
    pub fn suggestions(&self, interests: &str) -> AssembledPrompt {
        let mut user = format!(
            "Suggest {} diverse, interesting topics for Socratic learning exploration.\n",
            SUGGESTION_COUNT
        );
        if interests.trim().is_empty() {
            user.push_str(
                "Provide a diverse mix across science, technology, philosophy, mathematics, \
                 history, and social sciences.\n",
            );
        } else {
            user.push_str(&format!("The student is interested in: {}\n", interests));
        }
        user.push_str(SUGGESTION_SHAPE);
        self.assemble(PromptKind::Suggestions, SUGGESTION_SYSTEM_PROMPT, user)
    }

    fn assemble(&self, kind: PromptKind, system: &str, user: String) -> AssembledPrompt {
        let temperature = match kind {
            PromptKind::Start => self.temperatures.start,
            PromptKind::Continue => self.temperatures.continue_dialogue,
            PromptKind::Hint => self.temperatures.hint,
            PromptKind::Summary => self.temperatures.summary,
            PromptKind::Suggestions => self.temperatures.suggestions,
        };
        AssembledPrompt {
            kind,
            system: system.to_string(),
            user,
            temperature,
        }
    }
}

fn speaker(turn: &Turn) -> &'static str {
    match turn.role {
        Role::Assistant => "Socratic",
        Role::Student => "Student",
    }
}

/// A structured turn without a question falls back to its JSON form so the
/// summary still sees what was said. An empty question counts as missing,
/// since a defaulted field cannot be told apart from a blank one.
fn summary_text(turn: &Turn) -> String {
    match &turn.content {
        TurnContent::Structured(reply) if reply.question.is_empty() => {
            serde_json::to_string(reply).unwrap_or_default()
        }
        _ => turn.display_text().to_string(),
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use socratic_test_utils::generators::arb_transcript;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every turn is rendered verbatim, one line each, in transcript order.
        #[test]
        fn prop_continue_renders_turns_in_order(transcript in arb_transcript(12), reply in "[a-z ]{1,20}") {
            let prompt = PromptAssembler::default().continue_dialogue("Topic", &transcript, &reply);
            let mut cursor = 0;
            for turn in transcript.iter() {
                let line = match turn.role {
                    Role::Assistant => format!("Socratic (you previously asked): {}\n", turn.display_text()),
                    Role::Student => format!("Student responded: {}\n", turn.display_text()),
                };
                let offset = prompt.user[cursor..].find(&line);
                prop_assert!(offset.is_some(), "turn rendered out of order: {:?}", line);
                cursor += offset.unwrap_or_default() + line.len();
            }
            let latest = format!("Student's latest response: {}", reply);
            prop_assert!(prompt.user[cursor..].contains(&latest));
        }

        /// Identical inputs give identical prompts.
        #[test]
        fn prop_assembly_is_deterministic(
            transcript in arb_transcript(10),
            topic in "[a-zA-Z ]{1,20}",
            text in "[a-z ]{0,20}",
        ) {
            let assembler = PromptAssembler::default();
            let build = || {
                vec![
                    assembler.start(&topic, &text),
                    assembler.continue_dialogue(&topic, &transcript, &text),
                    assembler.hint(&topic, &transcript, &text),
                    assembler.summary(&topic, &transcript),
                    assembler.suggestions(&text),
                ]
            };
            prop_assert_eq!(build(), build());
        }

        /// The hint prompt never renders more than six turns.
        #[test]
        fn prop_hint_history_is_bounded(transcript in arb_transcript(20)) {
            let prompt = PromptAssembler::default().hint("Topic", &transcript, "q");
            let history = prompt.user.split("Recent conversation:\n").nth(1).unwrap_or_default();
            let rendered = history
                .lines()
                .filter(|line| line.starts_with("Socratic: ") || line.starts_with("Student: "))
                .count();
            prop_assert_eq!(rendered, transcript.len().min(HINT_HISTORY_TURNS));
        }
    }
}
