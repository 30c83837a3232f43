use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttemptAnswer {
    pub attempt_id: i64,
    pub question_id: i64,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
