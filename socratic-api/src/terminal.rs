//! Terminal front end helpers
//!
//! Line parsing and plain-text rendering for the `socratic` binary. Kept
//! free of I/O so the loop in `main.rs` stays a thin shell.

use crate::error::ApiError;
use socratic_core::{LearningStats, StructuredReply, SuggestionReply, SummaryReply};
use std::fmt::Write;

pub const HELP: &str = "\
Type a topic to begin, then answer each question in your own words.
Commands:
  /hint               get a nudge on the current question
  /end                finish the session and see your summary
  /suggest [topics]   suggest things to explore, optionally around your interests
  /stats              show your learning totals
  /key <api-key>      set the provider API key for this run
  /help               show this help
  /quit               exit";

/// One line of learner input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Free text: a topic when no session is open, otherwise an answer.
    Text(String),
    Hint,
    End,
    Suggest(String),
    Stats,
    Key(String),
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    /// Parse a line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Self::Text(line.to_string()));
        };
        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (rest, ""),
        };
        Some(match name.to_ascii_lowercase().as_str() {
            "hint" => Self::Hint,
            "end" => Self::End,
            "suggest" => Self::Suggest(argument.to_string()),
            "stats" => Self::Stats,
            "key" => Self::Key(argument.to_string()),
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(name.to_string()),
        })
    }
}

/// Question block shown after every dialogue turn.
pub fn render_reply(reply: &StructuredReply) -> String {
    let mut out = String::new();
    if !reply.encouragement.is_empty() {
        let _ = writeln!(out, "{}", reply.encouragement);
    }
    let _ = writeln!(
        out,
        "[{} | understanding {}/100]",
        reply.difficulty_level, reply.understanding_score
    );
    let _ = write!(out, "{}", reply.question);
    out
}

pub fn render_summary(summary: &SummaryReply) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", summary.topic_summary);
    for (title, items) in [
        ("Key discoveries", &summary.key_discoveries),
        ("Misconceptions addressed", &summary.misconceptions_addressed),
        ("Still to explore", &summary.remaining_gaps),
        ("Try next", &summary.recommended_next_topics),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}:", title);
        for item in items {
            let _ = writeln!(out, "  - {}", item);
        }
    }
    if let Some(overall) = summary.overall_understanding {
        let _ = writeln!(out, "Overall understanding: {}/100", overall);
    }
    if !summary.learning_style_notes.is_empty() {
        let _ = writeln!(out, "{}", summary.learning_style_notes);
    }
    out.trim_end().to_string()
}

pub fn render_stats(stats: &LearningStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sessions completed: {}", stats.total_sessions);
    let _ = writeln!(out, "Questions answered: {}", stats.total_exchanges);
    let _ = writeln!(out, "Minutes learning:   {}", stats.total_learning_minutes);
    let _ = writeln!(out, "Average understanding: {}", stats.average_understanding);
    if !stats.topics_explored.is_empty() {
        let _ = write!(out, "Topics: {}", stats.topics_explored.join(", "));
    }
    out.trim_end().to_string()
}

pub fn render_suggestions(reply: &SuggestionReply) -> String {
    if reply.suggestions.is_empty() {
        return "No suggestions this time.".to_string();
    }
    reply
        .suggestions
        .iter()
        .map(|s| {
            format!(
                "- {} ({}, {}): {}",
                s.topic, s.category, s.difficulty, s.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Caller mistakes show their own message; system failures lead with the
/// code's default message.
pub fn render_error(error: &ApiError) -> String {
    if error.code.is_client_error() {
        error.message.clone()
    } else {
        format!("{}. {}", error.code.default_message(), error.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use socratic_core::{GatewayError, TopicSuggestion};

    #[test]
    fn test_parse_text_and_blank() {
        assert_eq!(Command::parse("   "), None);
        assert_eq!(
            Command::parse("  Photosynthesis "),
            Some(Command::Text("Photosynthesis".to_string()))
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/hint"), Some(Command::Hint));
        assert_eq!(Command::parse("/END"), Some(Command::End));
        assert_eq!(Command::parse("/quit"), Some(Command::Quit));
        assert_eq!(Command::parse("/stats"), Some(Command::Stats));
        assert_eq!(
            Command::parse("/suggest  music and maths "),
            Some(Command::Suggest("music and maths".to_string()))
        );
        assert_eq!(Command::parse("/suggest"), Some(Command::Suggest(String::new())));
        assert_eq!(
            Command::parse("/key sk-or-123"),
            Some(Command::Key("sk-or-123".to_string()))
        );
        assert_eq!(
            Command::parse("/dance"),
            Some(Command::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn test_render_reply_shows_question_last() {
        let text = render_reply(&StructuredReply {
            question: "What happens to the light?".to_string(),
            understanding_score: 40,
            difficulty_level: "intermediate".to_string(),
            encouragement: "Nice thinking.".to_string(),
            ..Default::default()
        });
        assert!(text.starts_with("Nice thinking."));
        assert!(text.contains("[intermediate | understanding 40/100]"));
        assert!(text.ends_with("What happens to the light?"));
    }

    #[test]
    fn test_render_summary_skips_empty_sections() {
        let text = render_summary(&SummaryReply {
            topic_summary: "Covered refraction.".to_string(),
            key_discoveries: vec!["Light bends".to_string()],
            overall_understanding: Some(72),
            ..Default::default()
        });
        assert!(text.contains("Key discoveries:\n  - Light bends"));
        assert!(!text.contains("Still to explore"));
        assert!(text.contains("Overall understanding: 72/100"));
    }

    #[test]
    fn test_render_suggestions() {
        let reply = SuggestionReply {
            suggestions: vec![TopicSuggestion {
                topic: "Entropy".to_string(),
                description: "Why time has a direction".to_string(),
                category: "physics".to_string(),
                difficulty: "advanced".to_string(),
            }],
        };
        assert_eq!(
            render_suggestions(&reply),
            "- Entropy (physics, advanced): Why time has a direction"
        );
        assert_eq!(
            render_suggestions(&SuggestionReply::default()),
            "No suggestions this time."
        );
    }

    #[test]
    fn test_render_stats_lists_topics() {
        let stats = LearningStats {
            total_sessions: 2,
            topics_explored: vec!["Optics".to_string(), "Entropy".to_string()],
            ..Default::default()
        };
        let text = render_stats(&stats);
        assert!(text.contains("Sessions completed: 2"));
        assert!(text.ends_with("Topics: Optics, Entropy"));
    }

    #[test]
    fn test_render_error_by_origin() {
        let conflict = ApiError::state_conflict("Session has already ended");
        assert_eq!(render_error(&conflict), "Session has already ended");

        let missing_key: ApiError = GatewayError::configuration("No API key configured").into();
        let text = render_error(&missing_key);
        assert!(text.starts_with(ErrorCode::ProviderNotConfigured.default_message()));
        assert!(text.ends_with("No API key configured"));
    }
}
