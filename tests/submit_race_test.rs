use quiz_backend::config::{Config, LogFormat};
use quiz_backend::dto::attempt_dto::SaveAnswerRequest;
use quiz_backend::dto::quiz_dto::{CreateQuestionPayload, CreateQuizPayload};
use quiz_backend::error::Error;
use quiz_backend::services::{attempt_service::AttemptService, quiz_service::QuizService};
use serde_json::json;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

struct FileDb {
    path: PathBuf,
    pool: SqlitePool,
}

impl FileDb {
    async fn open() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "quiz_submit_race_{}_{}.db",
            std::process::id(),
            nanos
        ));
        let config = Config {
            server_address: "127.0.0.1:0".into(),
            database_url: format!("sqlite://{}", path.display()),
            api_token: "race-token".into(),
            api_rps: 1000,
            db_max_connections: 4,
            log_format: LogFormat::Text,
        };

        let pool = quiz_backend::database::pool::create_pool(&config)
            .await
            .expect("file pool");
        quiz_backend::database::pool::run_migrations(&pool)
            .await
            .expect("migrations");
        Self { path, pool }
    }

    async fn close(self) {
        self.pool.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

#[tokio::test]
async fn concurrent_submits_grade_once_and_reject_the_loser() {
    let db = FileDb::open().await;
    let quizzes = QuizService::new(db.pool.clone());
    let attempts = AttemptService::new(db.pool.clone());

    let quiz = quizzes
        .create_quiz(CreateQuizPayload {
            title: Some("Race".into()),
            description: Some("two tabs, one submit".into()),
            time_limit_seconds: None,
            is_published: Some(true),
        })
        .await
        .unwrap();
    let payload: CreateQuestionPayload = serde_json::from_value(json!({
        "type": "short", "prompt": "Capital of Spain?", "correctAnswer": "Madrid"
    }))
    .unwrap();
    let question = quizzes.create_question(quiz.id, payload).await.unwrap();

    for _ in 0..10 {
        let (attempt, _, _) = attempts.start_attempt(Some(quiz.id)).await.unwrap();
        attempts
            .save_answer(
                attempt.id,
                SaveAnswerRequest {
                    question_id: Some(question.id),
                    value: Some(json!("madrid")),
                },
            )
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            attempts.submit_attempt(attempt.id),
            attempts.submit_attempt(attempt.id)
        );

        let outcomes = [first, second];
        let winners: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "exactly one submit succeeds: {:?}", outcomes);
        assert_eq!(winners[0].score, 1);

        let loser = outcomes
            .iter()
            .find_map(|r| r.as_ref().err())
            .expect("one submit fails");
        match loser {
            Error::BadRequest(msg) => assert_eq!(msg, "Attempt already submitted"),
            other => panic!("losing submit should be a 400, got {:?}", other),
        }

        let stored = attempts.get_attempt(attempt.id).await.unwrap();
        assert!(stored.submitted_at.is_some());
        assert_eq!(stored.score, Some(1));
    }

    db.close().await;
}

#[tokio::test]
async fn submitting_a_missing_attempt_is_not_found() {
    let db = FileDb::open().await;
    let attempts = AttemptService::new(db.pool.clone());

    let err = attempts.submit_attempt(404).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{:?}", err);

    db.close().await;
}
