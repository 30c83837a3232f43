use crate::models::question::{AnswerKey, Question};
use crate::models::quiz::Quiz;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    #[validate(required(message = "title and description are required"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    #[validate(required(message = "title and description are required"))]
    pub description: Option<String>,

    #[validate(range(min = 1, message = "Time limit must be at least 1 second"))]
    pub time_limit_seconds: Option<i64>,

    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizPayload {
    // Blank strings leave the stored value untouched
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub description: Option<String>,

    #[validate(range(min = 1, message = "Time limit must be at least 1 second"))]
    pub time_limit_seconds: Option<i64>,

    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionPayload {
    #[serde(rename = "type", default, deserialize_with = "trim_optional_string")]
    pub question_type: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub prompt: Option<String>,

    pub options: Option<Vec<String>>,

    /// `None` when absent, `Some(None)` when sent as null.
    #[serde(default, deserialize_with = "present_or_null")]
    pub correct_answer: Option<Option<AnswerKey>>,

    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionPayload {
    #[serde(rename = "type", default, deserialize_with = "trim_optional_string")]
    pub question_type: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub prompt: Option<String>,

    /// `Some(None)` clears the stored options.
    #[serde(default, deserialize_with = "present_or_null")]
    pub options: Option<Option<Vec<String>>>,

    pub correct_answer: Option<AnswerKey>,

    pub position: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<i64>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Quiz> for QuizResponse {
    fn from(q: Quiz) -> Self {
        Self {
            id: q.id,
            title: q.title,
            description: q.description,
            time_limit_seconds: q.time_limit_seconds,
            is_published: q.is_published,
            created_at: q.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: i64,
    pub quiz_id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<AnswerKey>,
    pub position: i64,
}

impl QuestionResponse {
    /// Taker-facing view without the correct answer.
    pub fn sanitized(q: Question) -> Self {
        Self {
            correct_answer: None,
            ..Self::from(q)
        }
    }
}

impl From<Question> for QuestionResponse {
    fn from(q: Question) -> Self {
        let options = q.options();
        let correct_answer = q.answer_key();
        Self {
            id: q.id,
            quiz_id: q.quiz_id,
            question_type: q.question_type,
            prompt: q.prompt,
            options,
            correct_answer,
            position: q.position,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizWithQuestionsResponse {
    #[serde(flatten)]
    pub quiz: QuizResponse,
    pub questions: Vec<QuestionResponse>,
}

fn trim_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

// Only runs when the key is present, so a missing key stays `None` via `default`
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_quiz_requires_non_blank_title_and_description() {
        let payload: CreateQuizPayload =
            serde_json::from_value(json!({ "title": "  ", "description": "d" })).unwrap();
        assert!(payload.validate().is_err());

        let payload: CreateQuizPayload =
            serde_json::from_value(json!({ "title": "Rust", "description": "basics" })).unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn correct_answer_distinguishes_missing_from_null() {
        let missing: CreateQuestionPayload =
            serde_json::from_value(json!({ "type": "short", "prompt": "p" })).unwrap();
        let null: CreateQuestionPayload = serde_json::from_value(
            json!({ "type": "short", "prompt": "p", "correctAnswer": null }),
        )
        .unwrap();
        let index: CreateQuestionPayload = serde_json::from_value(
            json!({ "type": "mcq", "prompt": "p", "correctAnswer": 1 }),
        )
        .unwrap();

        assert_eq!(missing.correct_answer, None);
        assert_eq!(null.correct_answer, Some(None));
        assert_eq!(index.correct_answer, Some(Some(AnswerKey::Index(1))));
    }

    #[test]
    fn update_options_null_means_clear() {
        let clear: UpdateQuestionPayload =
            serde_json::from_value(json!({ "options": null })).unwrap();
        let keep: UpdateQuestionPayload = serde_json::from_value(json!({})).unwrap();
        assert_eq!(clear.options, Some(None));
        assert_eq!(keep.options, None);
    }

    #[test]
    fn sanitized_question_hides_correct_answer() {
        let q = Question {
            id: 3,
            quiz_id: 1,
            question_type: "mcq".into(),
            prompt: "Pick".into(),
            options_json: Some(r#"["x","y"]"#.into()),
            correct_answer: Some("1".into()),
            position: 0,
            created_at: Utc::now(),
        };
        let creator = serde_json::to_value(QuestionResponse::from(q.clone())).unwrap();
        let taker = serde_json::to_value(QuestionResponse::sanitized(q)).unwrap();

        assert_eq!(creator["correctAnswer"], json!(1));
        assert_eq!(creator["quizId"], json!(1));
        assert!(taker.get("correctAnswer").is_none());
        assert_eq!(taker["options"], json!(["x", "y"]));
    }
}
