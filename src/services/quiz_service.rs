use crate::dto::quiz_dto::{
    CreateQuestionPayload, CreateQuizPayload, UpdateQuestionPayload, UpdateQuizPayload,
};
use crate::error::{Error, Result};
use crate::models::question::{AnswerKey, Question, QuestionType};
use crate::models::quiz::Quiz;
use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};

/// A question that passed creation rules, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub question_type: QuestionType,
    pub prompt: String,
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub position: Option<i64>,
}

#[derive(Clone)]
pub struct QuizService {
    pool: SqlitePool,
}

impl QuizService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_quizzes(&self) -> Result<Vec<Quiz>> {
        let quizzes = sqlx::query_as::<_, Quiz>(
            r#"SELECT * FROM quizzes ORDER BY created_at DESC, id DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(quizzes)
    }

    pub async fn create_quiz(&self, payload: CreateQuizPayload) -> Result<Quiz> {
        let (Some(title), Some(description)) = (payload.title, payload.description) else {
            return Err(Error::BadRequest(
                "title and description are required".to_string(),
            ));
        };

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (title, description, time_limit_seconds, is_published, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(payload.time_limit_seconds)
        .bind(payload.is_published.unwrap_or(false))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(quiz)
    }

    pub async fn get_quiz(&self, quiz_id: i64) -> Result<Quiz> {
        fetch_quiz(&self.pool, quiz_id).await
    }

    pub async fn update_quiz(&self, quiz_id: i64, payload: UpdateQuizPayload) -> Result<Quiz> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            UPDATE quizzes
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                time_limit_seconds = COALESCE(?, time_limit_seconds),
                is_published = COALESCE(?, is_published)
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(payload.title)
        .bind(payload.description)
        .bind(payload.time_limit_seconds)
        .bind(payload.is_published)
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        quiz.ok_or_else(|| Error::NotFound("Quiz not found".to_string()))
    }

    pub async fn list_questions(&self, quiz_id: i64) -> Result<Vec<Question>> {
        fetch_questions(&self.pool, quiz_id).await
    }

    pub async fn get_question(&self, question_id: i64) -> Result<Question> {
        let question = sqlx::query_as::<_, Question>(r#"SELECT * FROM questions WHERE id = ?"#)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?;
        question.ok_or_else(|| Error::NotFound("Question not found".to_string()))
    }

    pub async fn create_question(
        &self,
        quiz_id: i64,
        payload: CreateQuestionPayload,
    ) -> Result<Question> {
        self.get_quiz(quiz_id).await?;
        let new_question = validate_new_question(payload)?;

        let position = match new_question.position {
            Some(p) => p,
            None => {
                let max: i64 = sqlx::query_scalar(
                    r#"SELECT COALESCE(MAX(position), -1) FROM questions WHERE quiz_id = ?"#,
                )
                .bind(quiz_id)
                .fetch_one(&self.pool)
                .await?;
                max + 1
            }
        };

        let options_json = new_question
            .options
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (quiz_id, type, prompt, options_json, correct_answer, position, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(quiz_id)
        .bind(new_question.question_type.as_str())
        .bind(new_question.prompt)
        .bind(options_json)
        .bind(new_question.correct_answer)
        .bind(position)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(quiz_id, question_id = question.id, "question created");
        Ok(question)
    }

    pub async fn update_question(
        &self,
        question_id: i64,
        payload: UpdateQuestionPayload,
    ) -> Result<Question> {
        let existing = self.get_question(question_id).await?;

        let question_type = match payload.question_type.as_deref() {
            Some(raw) => raw
                .parse::<QuestionType>()
                .map_err(|_| Error::BadRequest("invalid type".to_string()))?
                .as_str()
                .to_string(),
            None => existing.question_type.clone(),
        };
        let is_mcq = question_type == QuestionType::Mcq.as_str();

        // The merged row must still be a valid mcq, whichever field changed
        let options = match payload.options {
            Some(opts) => opts,
            None => existing.options(),
        };
        if is_mcq && options.as_ref().map_or(true, |opts| opts.len() < 2) {
            return Err(Error::BadRequest("mcq requires options (>=2)".to_string()));
        }
        let options = options.as_ref().map(serde_json::to_string).transpose()?;

        let correct_answer = match payload.correct_answer {
            Some(AnswerKey::Index(_)) if !is_mcq => {
                return Err(Error::BadRequest(format!(
                    "{} requires correctAnswer (string)",
                    question_type
                )));
            }
            Some(AnswerKey::Index(idx)) if idx < 0 => {
                return Err(Error::BadRequest(
                    "correctAnswer index must not be negative".to_string(),
                ));
            }
            Some(key) => Some(key.to_stored()),
            None => existing.correct_answer.clone(),
        };

        let question = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions
            SET type = ?, prompt = ?, options_json = ?, correct_answer = ?, position = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(question_type)
        .bind(payload.prompt.unwrap_or(existing.prompt))
        .bind(options)
        .bind(correct_answer)
        .bind(payload.position.unwrap_or(existing.position))
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(question)
    }

    pub async fn delete_question(&self, question_id: i64) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM questions WHERE id = ?"#)
            .bind(question_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Question not found".to_string()));
        }
        Ok(())
    }
}

pub(crate) async fn fetch_quiz<'e, E>(executor: E, quiz_id: i64) -> Result<Quiz>
where
    E: SqliteExecutor<'e>,
{
    let quiz = sqlx::query_as::<_, Quiz>(r#"SELECT * FROM quizzes WHERE id = ?"#)
        .bind(quiz_id)
        .fetch_optional(executor)
        .await?;
    quiz.ok_or_else(|| Error::NotFound("Quiz not found".to_string()))
}

/// Questions of a quiz in display order.
pub(crate) async fn fetch_questions<'e, E>(executor: E, quiz_id: i64) -> Result<Vec<Question>>
where
    E: SqliteExecutor<'e>,
{
    let questions = sqlx::query_as::<_, Question>(
        r#"SELECT * FROM questions WHERE quiz_id = ? ORDER BY position ASC, id ASC"#,
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await?;
    Ok(questions)
}

/// Applies the per-type creation rules. Short and code questions accept a
/// null key, stored as the empty string.
pub fn validate_new_question(payload: CreateQuestionPayload) -> Result<NewQuestion> {
    let (Some(raw_type), Some(prompt)) = (payload.question_type, payload.prompt) else {
        return Err(Error::BadRequest("type and prompt are required".to_string()));
    };
    let question_type: QuestionType = raw_type
        .parse()
        .map_err(|_| Error::BadRequest("invalid type".to_string()))?;

    match question_type {
        QuestionType::Mcq => {
            let options = match payload.options {
                Some(opts) if opts.len() >= 2 => opts,
                _ => return Err(Error::BadRequest("mcq requires options (>=2)".to_string())),
            };
            let key = match payload.correct_answer {
                Some(Some(key)) => key,
                _ => {
                    return Err(Error::BadRequest(
                        "mcq requires correctAnswer (index or text)".to_string(),
                    ))
                }
            };
            if let AnswerKey::Index(idx) = key {
                if idx < 0 || idx as usize >= options.len() {
                    return Err(Error::BadRequest(format!(
                        "mcq correctAnswer index {} is out of range",
                        idx
                    )));
                }
            }

            Ok(NewQuestion {
                question_type,
                prompt,
                options: Some(options),
                correct_answer: key.to_stored(),
                position: payload.position,
            })
        }
        QuestionType::Short | QuestionType::Code => {
            let correct_answer = match payload.correct_answer {
                Some(Some(AnswerKey::Text(text))) => text,
                Some(None) => String::new(),
                _ => {
                    return Err(Error::BadRequest(format!(
                        "{} requires correctAnswer (string)",
                        question_type
                    )))
                }
            };

            Ok(NewQuestion {
                question_type,
                prompt,
                options: None,
                correct_answer,
                position: payload.position,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> CreateQuestionPayload {
        serde_json::from_value(value).expect("payload")
    }

    fn message(err: Error) -> String {
        match err {
            Error::BadRequest(msg) => msg,
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn type_and_prompt_are_required() {
        let err = validate_new_question(payload(json!({ "prompt": "p" }))).unwrap_err();
        assert_eq!(message(err), "type and prompt are required");

        let err = validate_new_question(payload(json!({ "type": "essay", "prompt": "p" })))
            .unwrap_err();
        assert_eq!(message(err), "invalid type");
    }

    #[test]
    fn mcq_needs_two_options_and_a_key() {
        let err = validate_new_question(payload(json!({
            "type": "mcq", "prompt": "p", "options": ["only"], "correctAnswer": 0
        })))
        .unwrap_err();
        assert_eq!(message(err), "mcq requires options (>=2)");

        let err = validate_new_question(payload(json!({
            "type": "mcq", "prompt": "p", "options": ["a", "b"]
        })))
        .unwrap_err();
        assert_eq!(message(err), "mcq requires correctAnswer (index or text)");

        let err = validate_new_question(payload(json!({
            "type": "mcq", "prompt": "p", "options": ["a", "b"], "correctAnswer": 2
        })))
        .unwrap_err();
        assert!(message(err).contains("out of range"));
    }

    #[test]
    fn mcq_key_is_stored_as_string() {
        let by_index = validate_new_question(payload(json!({
            "type": "mcq", "prompt": "p", "options": ["a", "b"], "correctAnswer": 1
        })))
        .unwrap();
        let by_text = validate_new_question(payload(json!({
            "type": "mcq", "prompt": "p", "options": ["a", "b"], "correctAnswer": "b"
        })))
        .unwrap();

        assert_eq!(by_index.correct_answer, "1");
        assert_eq!(by_text.correct_answer, "b");
        assert_eq!(by_index.options, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn text_questions_take_string_or_null_keys() {
        let short = validate_new_question(payload(json!({
            "type": "short", "prompt": "p", "correctAnswer": null
        })))
        .unwrap();
        assert_eq!(short.correct_answer, "");
        assert_eq!(short.options, None);

        let err = validate_new_question(payload(json!({ "type": "code", "prompt": "p" })))
            .unwrap_err();
        assert_eq!(message(err), "code requires correctAnswer (string)");

        let err = validate_new_question(payload(json!({
            "type": "short", "prompt": "p", "correctAnswer": 3
        })))
        .unwrap_err();
        assert_eq!(message(err), "short requires correctAnswer (string)");
    }
}
