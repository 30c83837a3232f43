use crate::dto::attempt_dto::SaveAnswerRequest;
use crate::error::{Error, Result};
use crate::models::attempt::Attempt;
use crate::models::attempt_answer::AttemptAnswer;
use crate::models::attempt_event::AttemptEvent;
use crate::models::question::Question;
use crate::models::quiz::Quiz;
use crate::services::grading_service::{GradingResult, GradingService};
use crate::services::quiz_service::{fetch_questions, fetch_quiz};
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{SqliteExecutor, SqlitePool};
use std::collections::HashMap;

#[derive(Clone)]
pub struct AttemptService {
    pool: SqlitePool,
}

impl AttemptService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens an attempt on a published quiz and returns it with the quiz and
    /// its questions in display order.
    pub async fn start_attempt(&self, quiz_id: Option<i64>) -> Result<(Attempt, Quiz, Vec<Question>)> {
        let quiz_id = quiz_id
            .filter(|id| *id != 0)
            .ok_or_else(|| Error::BadRequest("quizId required".to_string()))?;
        let quiz = fetch_quiz(&self.pool, quiz_id).await?;
        if !quiz.is_published {
            tracing::warn!(quiz_id, "attempt rejected: quiz is not published");
            return Err(Error::BadRequest("Quiz is not published".to_string()));
        }

        let attempt = sqlx::query_as::<_, Attempt>(
            r#"INSERT INTO attempts (quiz_id, started_at) VALUES (?, ?) RETURNING *"#,
        )
        .bind(quiz_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let questions = fetch_questions(&self.pool, quiz_id).await?;
        tracing::info!(
            attempt_id = attempt.id,
            quiz_id,
            questions = questions.len(),
            "attempt started"
        );
        Ok((attempt, quiz, questions))
    }

    pub async fn get_attempt(&self, attempt_id: i64) -> Result<Attempt> {
        fetch_attempt(&self.pool, attempt_id).await
    }

    pub async fn list_answers(&self, attempt_id: i64) -> Result<Vec<AttemptAnswer>> {
        fetch_answers(&self.pool, attempt_id).await
    }

    /// Records or overwrites the answer for one question of the attempt's quiz.
    pub async fn save_answer(&self, attempt_id: i64, req: SaveAnswerRequest) -> Result<()> {
        let (Some(question_id), Some(value)) = (req.question_id, req.value) else {
            return Err(Error::BadRequest("questionId and value required".to_string()));
        };
        let value = answer_value_to_string(value)?;

        let attempt = self.get_open_attempt(attempt_id).await?;

        let question = sqlx::query_as::<_, Question>(r#"SELECT * FROM questions WHERE id = ?"#)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;
        if question.quiz_id != attempt.quiz_id {
            tracing::warn!(
                attempt_id,
                question_id,
                "answer rejected: question belongs to another quiz"
            );
            return Err(Error::BadRequest(
                "Question does not belong to this attempt's quiz".to_string(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO attempt_answers (attempt_id, question_id, value, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (attempt_id, question_id)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(attempt_id)
        .bind(question_id)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Claims the attempt, grades it and stores the score. The claim is the
    /// first statement of the transaction, so a concurrent submit waits on
    /// the write lock and then finds the attempt already claimed.
    pub async fn submit_attempt(&self, attempt_id: i64) -> Result<GradingResult> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query_as::<_, Attempt>(
            r#"UPDATE attempts SET submitted_at = ? WHERE id = ? AND submitted_at IS NULL RETURNING *"#,
        )
        .bind(Utc::now())
        .bind(attempt_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(attempt) = claimed else {
            tx.rollback().await?;
            // Missing attempts surface as 404 from the lookup
            self.get_attempt(attempt_id).await?;
            tracing::warn!(attempt_id, "submit rejected: attempt already submitted");
            return Err(Error::BadRequest("Attempt already submitted".to_string()));
        };

        let questions = fetch_questions(&mut *tx, attempt.quiz_id).await?;
        let answers: HashMap<i64, String> = fetch_answers(&mut *tx, attempt_id)
            .await?
            .into_iter()
            .map(|a| (a.question_id, a.value))
            .collect();

        tracing::info!(attempt_id, questions = questions.len(), "grading attempt");
        let result = GradingService::grade(&questions, &answers);

        sqlx::query(r#"UPDATE attempts SET score = ? WHERE id = ?"#)
            .bind(result.score)
            .bind(attempt_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            attempt_id,
            score = result.score,
            total = questions.len(),
            "attempt submitted"
        );
        Ok(result)
    }

    /// Appends an anti-cheat telemetry event (tab switch, paste, ...).
    pub async fn record_event(&self, attempt_id: i64, event: Option<JsonValue>) -> Result<AttemptEvent> {
        let event = match event {
            Some(JsonValue::String(s)) if !s.is_empty() => s,
            _ => {
                return Err(Error::BadRequest(
                    "event is required and must be a string".to_string(),
                ))
            }
        };

        self.get_open_attempt(attempt_id).await?;

        let row = sqlx::query_as::<_, AttemptEvent>(
            r#"INSERT INTO attempt_events (attempt_id, event, created_at) VALUES (?, ?, ?) RETURNING *"#,
        )
        .bind(attempt_id)
        .bind(&event)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(attempt_id, event = %event, "anti-cheat event recorded");
        Ok(row)
    }

    pub async fn list_events(&self, attempt_id: i64) -> Result<Vec<AttemptEvent>> {
        self.get_attempt(attempt_id).await?;
        let events = sqlx::query_as::<_, AttemptEvent>(
            r#"SELECT * FROM attempt_events WHERE attempt_id = ? ORDER BY id ASC"#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn get_open_attempt(&self, attempt_id: i64) -> Result<Attempt> {
        let attempt = self.get_attempt(attempt_id).await?;
        if attempt.is_submitted() {
            return Err(Error::BadRequest("Attempt already submitted".to_string()));
        }
        Ok(attempt)
    }
}

async fn fetch_attempt<'e, E>(executor: E, attempt_id: i64) -> Result<Attempt>
where
    E: SqliteExecutor<'e>,
{
    let attempt = sqlx::query_as::<_, Attempt>(r#"SELECT * FROM attempts WHERE id = ?"#)
        .bind(attempt_id)
        .fetch_optional(executor)
        .await?;
    attempt.ok_or_else(|| Error::NotFound("Attempt not found".to_string()))
}

async fn fetch_answers<'e, E>(executor: E, attempt_id: i64) -> Result<Vec<AttemptAnswer>>
where
    E: SqliteExecutor<'e>,
{
    let answers = sqlx::query_as::<_, AttemptAnswer>(
        r#"SELECT * FROM attempt_answers WHERE attempt_id = ? ORDER BY question_id ASC"#,
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await?;
    Ok(answers)
}

/// Answers are stored as text; scalars keep their JSON spelling.
fn answer_value_to_string(value: JsonValue) -> Result<String> {
    match value {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::BadRequest(
            "value must be a string, number or boolean".to_string(),
        )),
    }
}
