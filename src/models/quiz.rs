use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub time_limit_seconds: Option<i64>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}
