use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A question row as stored. `question_type` stays a plain string so that a
/// row with an unrecognised type still loads and can be graded as unmatched.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    #[sqlx(rename = "type")]
    pub question_type: String,
    pub prompt: String,
    pub options_json: Option<String>,
    pub correct_answer: Option<String>,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn kind(&self) -> Option<QuestionType> {
        self.question_type.parse().ok()
    }

    /// Stored options; unreadable JSON is treated as no options at all.
    pub fn options(&self) -> Option<Vec<String>> {
        self.options_json
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    /// Correct answer in its client-facing shape: MCQ keys that hold a
    /// non-negative integer come back as an index.
    pub fn answer_key(&self) -> Option<AnswerKey> {
        let raw = self.correct_answer.as_ref()?;
        if self.kind() == Some(QuestionType::Mcq) {
            if let Ok(idx) = raw.trim().parse::<i64>() {
                if idx >= 0 {
                    return Some(AnswerKey::Index(idx));
                }
            }
        }
        Some(AnswerKey::Text(raw.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Short,
    Code,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Short => "short",
            QuestionType::Code => "code",
        }
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mcq" => Ok(QuestionType::Mcq),
            "short" => Ok(QuestionType::Short),
            "code" => Ok(QuestionType::Code),
            other => Err(format!("invalid question type '{}'", other)),
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A correct answer as clients send it: an option index or free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerKey {
    Index(i64),
    Text(String),
}

impl AnswerKey {
    pub fn to_stored(&self) -> String {
        match self {
            AnswerKey::Index(idx) => idx.to_string(),
            AnswerKey::Text(text) => text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str, correct: Option<&str>) -> Question {
        Question {
            id: 1,
            quiz_id: 1,
            question_type: kind.to_string(),
            prompt: "?".to_string(),
            options_json: Some(r#"["a","b"]"#.to_string()),
            correct_answer: correct.map(str::to_string),
            position: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn mcq_numeric_key_is_exposed_as_index() {
        assert_eq!(row("mcq", Some("1")).answer_key(), Some(AnswerKey::Index(1)));
        assert_eq!(
            row("mcq", Some("-1")).answer_key(),
            Some(AnswerKey::Text("-1".into()))
        );
        assert_eq!(
            row("short", Some("42")).answer_key(),
            Some(AnswerKey::Text("42".into()))
        );
        assert_eq!(row("mcq", None).answer_key(), None);
    }

    #[test]
    fn broken_options_json_reads_as_none() {
        let mut q = row("mcq", Some("0"));
        q.options_json = Some("not json".into());
        assert!(q.options().is_none());
    }

    #[test]
    fn answer_key_accepts_number_or_string() {
        let idx: AnswerKey = serde_json::from_str("2").unwrap();
        let text: AnswerKey = serde_json::from_str("\"Paris\"").unwrap();
        assert_eq!(idx, AnswerKey::Index(2));
        assert_eq!(text.to_stored(), "Paris");
    }
}
