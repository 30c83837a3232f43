use crate::dto::quiz_dto::QuestionResponse;
use crate::models::attempt::Attempt;
use crate::models::attempt_answer::AttemptAnswer;
use crate::models::attempt_event::AttemptEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptRequest {
    pub quiz_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptQuizSnapshot {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<i64>,
    pub questions: Vec<QuestionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptResponse {
    pub id: i64,
    pub quiz_id: i64,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub answers: Vec<AttemptAnswerResponse>,
    pub quiz: AttemptQuizSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAnswerResponse {
    pub question_id: i64,
    pub value: String,
}

impl From<AttemptAnswer> for AttemptAnswerResponse {
    fn from(a: AttemptAnswer) -> Self {
        Self {
            question_id: a.question_id,
            value: a.value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResponse {
    pub id: i64,
    pub quiz_id: i64,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    pub answers: Vec<AttemptAnswerResponse>,
}

impl AttemptResponse {
    pub fn new(attempt: Attempt, answers: Vec<AttemptAnswer>) -> Self {
        Self {
            id: attempt.id,
            quiz_id: attempt.quiz_id,
            started_at: attempt.started_at,
            submitted_at: attempt.submitted_at,
            score: attempt.score,
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }
}

/// `value` may be any JSON scalar; it is stored in its string form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAnswerRequest {
    pub question_id: Option<i64>,
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackEventRequest {
    pub event: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptEventResponse {
    pub id: i64,
    pub event: String,
    pub created_at: DateTime<Utc>,
}

impl From<AttemptEvent> for AttemptEventResponse {
    fn from(e: AttemptEvent) -> Self {
        Self {
            id: e.id,
            event: e.event,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}
