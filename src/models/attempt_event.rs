use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttemptEvent {
    pub id: i64,
    pub attempt_id: i64,
    pub event: String,
    pub created_at: DateTime<Utc>,
}
