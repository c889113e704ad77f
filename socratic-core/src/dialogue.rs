//! Dialogue primitives: turns, transcripts, and the reply shapes the
//! provider is asked to produce.
//!
//! Reply types deserialize leniently. Missing or `null` fields take their
//! defaults, mistyped scalars are coerced and enum-like fields stay as
//! strings, so any JSON object decodes. Range and membership checks belong to the
//! caller (see [`clamp_score`] and [`DifficultyLevel::parse_or_default`]).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// ROLES AND TURNS
// ============================================================================

/// Author of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Role {
    #[serde(rename = "assistant")]
    Assistant,
    /// Persisted as `user`; `student` is accepted on input.
    #[serde(rename = "user", alias = "student")]
    Student,
}

/// Body of a turn. Assistant replies are structured, learner answers and
/// hint text are plain strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Structured(StructuredReply),
}

/// One message in a dialogue transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

impl Turn {
    /// An assistant turn carrying a decoded reply.
    pub fn assistant(reply: StructuredReply) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Structured(reply),
        }
    }

    /// An assistant turn carrying plain text.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Text(text.into()),
        }
    }

    /// A learner turn.
    pub fn student(text: impl Into<String>) -> Self {
        Self {
            role: Role::Student,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// The text a turn contributes to a rendered prompt: the question of a
    /// structured reply, the raw text otherwise.
    pub fn display_text(&self) -> &str {
        match &self.content {
            TurnContent::Text(text) => text,
            TurnContent::Structured(reply) => &reply.question,
        }
    }
}

/// Ordered dialogue history for one session. Insertion order is the
/// dialogue order and is never changed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<Turn>);

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.0.push(turn);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.0.iter()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.0
    }

    /// The trailing `n` turns (all of them if fewer exist).
    pub fn last_n(&self, n: usize) -> &[Turn] {
        let start = self.0.len().saturating_sub(n);
        &self.0[start..]
    }

    /// Question of the most recent assistant turn, empty if there is none.
    pub fn current_question(&self) -> String {
        self.0
            .iter()
            .rev()
            .find(|turn| turn.is_assistant())
            .map(|turn| turn.display_text().to_string())
            .unwrap_or_default()
    }
}

impl From<Vec<Turn>> for Transcript {
    fn from(turns: Vec<Turn>) -> Self {
        Self(turns)
    }
}

impl FromIterator<Turn> for Transcript {
    fn from_iter<I: IntoIterator<Item = Turn>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// DIFFICULTY
// ============================================================================

/// Question difficulty ladder, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Foundational,
    Intermediate,
    Advanced,
    Mastery,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 4] = [
        Self::Foundational,
        Self::Intermediate,
        Self::Advanced,
        Self::Mastery,
    ];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Foundational => "foundational",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Mastery => "mastery",
        }
    }

    /// Parse from database string representation (case-insensitive).
    pub fn from_db_str(s: &str) -> Result<Self, DifficultyLevelParseError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "foundational" => Ok(Self::Foundational),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            "mastery" => Ok(Self::Mastery),
            _ => Err(DifficultyLevelParseError(s.to_string())),
        }
    }

    /// Parse a provider-supplied level; anything unrecognized is foundational.
    pub fn parse_or_default(s: &str) -> Self {
        Self::from_db_str(s).unwrap_or_default()
    }

    /// Position on the ladder, 0 for foundational.
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        Self::Foundational
    }
}

impl std::fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Error parsing DifficultyLevel from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultyLevelParseError(pub String);

impl std::fmt::Display for DifficultyLevelParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid difficulty level: {}", self.0)
    }
}

impl std::error::Error for DifficultyLevelParseError {}

/// Clamp an untrusted provider score into `[0, 100]`.
pub fn clamp_score(score: i64) -> i32 {
    score.clamp(0, 100) as i32
}

// ============================================================================
// REPLY SHAPES
// ============================================================================

/// What the provider reports about the learner's latest answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct UnderstandingSignals {
    #[serde(deserialize_with = "lenient_strings")]
    pub correct_insights: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub misconceptions: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub gaps: Vec<String>,
}

/// Decoded answer to a dialogue turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct StructuredReply {
    #[serde(deserialize_with = "lenient_string")]
    pub question: String,
    /// Diagnostic reasoning, never shown to the learner.
    #[serde(deserialize_with = "lenient_string")]
    pub thinking: String,
    #[serde(deserialize_with = "lenient_or_default")]
    pub understanding_signals: UnderstandingSignals,
    /// Unvalidated; callers clamp with [`clamp_score`].
    #[serde(deserialize_with = "lenient_score")]
    pub understanding_score: i64,
    /// Unvalidated; callers parse with [`DifficultyLevel::parse_or_default`].
    #[serde(deserialize_with = "lenient_string")]
    pub difficulty_level: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub hint_available: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub encouragement: String,
}

impl StructuredReply {
    pub fn difficulty(&self) -> DifficultyLevel {
        DifficultyLevel::parse_or_default(&self.difficulty_level)
    }

    pub fn clamped_score(&self) -> i32 {
        clamp_score(self.understanding_score)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct HintReply {
    #[serde(deserialize_with = "lenient_string")]
    pub hint: String,
}

/// End-of-session learning summary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct SummaryReply {
    #[serde(deserialize_with = "lenient_string")]
    pub topic_summary: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub key_discoveries: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub misconceptions_addressed: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub remaining_gaps: Vec<String>,
    /// `None` when the provider omitted it.
    #[serde(deserialize_with = "lenient_optional_score")]
    pub overall_understanding: Option<i64>,
    #[serde(deserialize_with = "lenient_strings")]
    pub recommended_next_topics: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub learning_style_notes: String,
    #[serde(deserialize_with = "lenient_score")]
    pub time_well_spent_score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct TopicSuggestion {
    #[serde(deserialize_with = "lenient_string")]
    pub topic: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub category: String,
    /// Requested as one of beginner, intermediate, advanced; not enforced.
    #[serde(deserialize_with = "lenient_string")]
    pub difficulty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct SuggestionReply {
    /// Entries that are not objects are skipped.
    #[serde(deserialize_with = "lenient_suggestions")]
    pub suggestions: Vec<TopicSuggestion>,
}

// Field deserializers below accept any JSON value. `null` reads as the
// field's default, and scalars of the wrong type are coerced where a
// reading exists.

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(value_text).unwrap_or_default())
}

/// An array keeps its non-null entries as text; a lone non-blank string
/// becomes a one-item list.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter(|item| !item.is_null())
            .map(value_text)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

/// `true`, `"true"`, `"yes"` and non-zero numbers read as true.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "1"
        ),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    })
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default())
}

fn lenient_suggestions<'de, D>(deserializer: D) -> Result<Vec<TopicSuggestion>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Accept an integer, a float (truncated) or a numeric string. Anything else
/// reads as 0.
fn lenient_score<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_optional_score(deserializer).map(Option::unwrap_or_default)
}

fn lenient_optional_score<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_value(Role::Student).unwrap(), json!("user"));
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), json!("assistant"));
        let parsed: Role = serde_json::from_value(json!("student")).unwrap();
        assert_eq!(parsed, Role::Student);
    }

    #[test]
    fn test_turn_content_untagged_roundtrip() {
        let turns = vec![
            Turn::assistant(StructuredReply {
                question: "What is light?".to_string(),
                ..Default::default()
            }),
            Turn::student("Energy, I think"),
        ];
        let transcript = Transcript::from(turns);
        let encoded = serde_json::to_string(&transcript).unwrap();
        let decoded: Transcript = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, transcript);
        assert!(matches!(decoded.turns()[0].content, TurnContent::Structured(_)));
        assert!(matches!(decoded.turns()[1].content, TurnContent::Text(_)));
    }

    #[test]
    fn test_current_question_uses_latest_assistant_turn() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.current_question(), "");

        transcript.push(Turn::assistant(StructuredReply {
            question: "first".to_string(),
            ..Default::default()
        }));
        transcript.push(Turn::student("answer"));
        transcript.push(Turn::assistant_text("second"));
        transcript.push(Turn::student("another answer"));

        assert_eq!(transcript.current_question(), "second");
    }

    #[test]
    fn test_last_n_clamps_to_length() {
        let transcript: Transcript = (0..3).map(|i| Turn::student(i.to_string())).collect();
        assert_eq!(transcript.last_n(6).len(), 3);
        assert_eq!(transcript.last_n(2)[0].display_text(), "1");
        assert!(transcript.last_n(0).is_empty());
    }

    #[test]
    fn test_difficulty_parse_and_rank() {
        assert_eq!(
            DifficultyLevel::from_db_str(" Advanced ").unwrap(),
            DifficultyLevel::Advanced
        );
        assert!(DifficultyLevel::from_db_str("expert").is_err());
        assert_eq!(
            DifficultyLevel::parse_or_default("expert"),
            DifficultyLevel::Foundational
        );
        assert!(DifficultyLevel::Mastery.rank() > DifficultyLevel::Intermediate.rank());
        for level in DifficultyLevel::ALL {
            assert_eq!(DifficultyLevel::from_db_str(level.as_db_str()).unwrap(), level);
        }
    }

    #[test]
    fn test_structured_reply_tolerates_missing_and_odd_fields() {
        let reply: StructuredReply = serde_json::from_value(json!({
            "question": "Why?",
            "understanding_score": 72.9,
            "difficulty_level": "legendary"
        }))
        .unwrap();
        assert_eq!(reply.question, "Why?");
        assert_eq!(reply.understanding_score, 72);
        assert_eq!(reply.difficulty(), DifficultyLevel::Foundational);
        assert!(reply.understanding_signals.gaps.is_empty());
        assert!(!reply.hint_available);
    }

    #[test]
    fn test_structured_reply_tolerates_nulls_and_mistyped_scalars() {
        let reply: StructuredReply = serde_json::from_value(json!({
            "question": "Why does ice float?",
            "thinking": null,
            "understanding_signals": {
                "correct_insights": ["density", null],
                "misconceptions": "ice is heavier",
                "gaps": null
            },
            "understanding_score": null,
            "difficulty_level": 2,
            "hint_available": "true",
            "encouragement": null
        }))
        .unwrap();
        assert_eq!(reply.question, "Why does ice float?");
        assert!(reply.thinking.is_empty());
        assert_eq!(reply.understanding_signals.correct_insights, vec!["density"]);
        assert_eq!(reply.understanding_signals.misconceptions, vec!["ice is heavier"]);
        assert!(reply.understanding_signals.gaps.is_empty());
        assert_eq!(reply.understanding_score, 0);
        assert_eq!(reply.difficulty_level, "2");
        assert!(reply.hint_available);
        assert!(reply.encouragement.is_empty());

        let reply: StructuredReply = serde_json::from_value(json!({
            "understanding_signals": null,
            "hint_available": 0
        }))
        .unwrap();
        assert_eq!(reply.understanding_signals, UnderstandingSignals::default());
        assert!(!reply.hint_available);
    }

    #[test]
    fn test_summary_and_suggestions_tolerate_nulls() {
        let summary: SummaryReply = serde_json::from_value(json!({
            "topic_summary": "Cells",
            "key_discoveries": null,
            "learning_style_notes": null,
            "overall_understanding": null,
            "time_well_spent_score": "8"
        }))
        .unwrap();
        assert_eq!(summary.topic_summary, "Cells");
        assert!(summary.key_discoveries.is_empty());
        assert!(summary.learning_style_notes.is_empty());
        assert_eq!(summary.overall_understanding, None);
        assert_eq!(summary.time_well_spent_score, 8);

        let suggestions: SuggestionReply = serde_json::from_value(json!({
            "suggestions": [
                { "topic": "Entropy", "description": null, "difficulty": "advanced" },
                "not an object",
                null
            ]
        }))
        .unwrap();
        assert_eq!(suggestions.suggestions.len(), 1);
        assert_eq!(suggestions.suggestions[0].topic, "Entropy");
        assert!(suggestions.suggestions[0].description.is_empty());

        let empty: SuggestionReply = serde_json::from_value(json!({ "suggestions": null })).unwrap();
        assert!(empty.suggestions.is_empty());

        let hint: HintReply = serde_json::from_value(json!({ "hint": null })).unwrap();
        assert!(hint.hint.is_empty());
    }

    #[test]
    fn test_out_of_range_score_passes_through_until_clamped() {
        let reply: StructuredReply =
            serde_json::from_value(json!({ "understanding_score": 250 })).unwrap();
        assert_eq!(reply.understanding_score, 250);
        assert_eq!(reply.clamped_score(), 100);
        assert_eq!(clamp_score(-4), 0);
    }

    #[test]
    fn test_summary_overall_understanding_optional() {
        let summary: SummaryReply =
            serde_json::from_value(json!({ "topic_summary": "Cells" })).unwrap();
        assert_eq!(summary.overall_understanding, None);

        let summary: SummaryReply =
            serde_json::from_value(json!({ "overall_understanding": "64" })).unwrap();
        assert_eq!(summary.overall_understanding, Some(64));
    }
}
