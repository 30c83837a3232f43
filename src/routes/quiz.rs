use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::quiz_dto::{
        CreateQuestionPayload, CreateQuizPayload, QuestionResponse, QuizResponse,
        QuizWithQuestionsResponse, UpdateQuizPayload,
    },
    error::Result,
    AppState,
};

#[utoipa::path(
    get,
    path = "/quizzes",
    responses(
        (status = 200, description = "Quizzes, newest first", body = Vec<QuizResponse>),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler]
pub async fn list_quizzes(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.list_quizzes().await?;
    tracing::debug!(count = quizzes.len(), "listed quizzes");
    let body: Vec<QuizResponse> = quizzes.into_iter().map(QuizResponse::from).collect();
    Ok(Json(body))
}

#[utoipa::path(
    post,
    path = "/quizzes",
    request_body = CreateQuizPayload,
    responses(
        (status = 201, description = "Quiz created", body = QuizResponse),
        (status = 400, description = "title and description are required")
    )
)]
#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let quiz = state.quiz_service.create_quiz(payload).await?;
    tracing::info!(quiz_id = quiz.id, "quiz created");
    Ok((StatusCode::CREATED, Json(QuizResponse::from(quiz))))
}

#[utoipa::path(
    get,
    path = "/quizzes/{id}",
    params(
        ("id" = i64, Path, description = "Quiz ID")
    ),
    responses(
        (status = 200, description = "Quiz with questions, including correct answers", body = QuizWithQuestionsResponse),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let quiz = state.quiz_service.get_quiz(id).await?;
    let questions = state.quiz_service.list_questions(id).await?;
    Ok(Json(QuizWithQuestionsResponse {
        quiz: QuizResponse::from(quiz),
        questions: questions.into_iter().map(QuestionResponse::from).collect(),
    }))
}

#[utoipa::path(
    patch,
    path = "/quizzes/{id}",
    params(
        ("id" = i64, Path, description = "Quiz ID")
    ),
    request_body = UpdateQuizPayload,
    responses(
        (status = 200, description = "Quiz updated", body = QuizResponse),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn update_quiz(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let quiz = state.quiz_service.update_quiz(id, payload).await?;
    Ok(Json(QuizResponse::from(quiz)))
}

#[utoipa::path(
    post,
    path = "/quizzes/{id}/questions",
    params(
        ("id" = i64, Path, description = "Quiz ID")
    ),
    request_body = CreateQuestionPayload,
    responses(
        (status = 201, description = "Question created", body = QuestionResponse),
        (status = 400, description = "Invalid question"),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateQuestionPayload>,
) -> Result<impl IntoResponse> {
    let question = state.quiz_service.create_question(id, payload).await?;
    Ok((StatusCode::CREATED, Json(QuestionResponse::from(question))))
}
