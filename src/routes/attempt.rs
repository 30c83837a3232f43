use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::dto::attempt_dto::{
    AttemptEventResponse, AttemptQuizSnapshot, AttemptResponse, OkResponse, SaveAnswerRequest,
    StartAttemptRequest, StartAttemptResponse, TrackEventRequest,
};
use crate::dto::quiz_dto::QuestionResponse;
use crate::AppState;

#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Json(req): Json<StartAttemptRequest>,
) -> crate::error::Result<Response> {
    tracing::info!("Starting attempt for quiz: {:?}", req.quiz_id);
    let (attempt, quiz, questions) = state.attempt_service.start_attempt(req.quiz_id).await?;

    let response = StartAttemptResponse {
        id: attempt.id,
        quiz_id: attempt.quiz_id,
        started_at: attempt.started_at,
        submitted_at: attempt.submitted_at,
        answers: Vec::new(),
        quiz: AttemptQuizSnapshot {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            time_limit_seconds: quiz.time_limit_seconds,
            questions: questions.into_iter().map(QuestionResponse::sanitized).collect(),
        },
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

#[axum::debug_handler]
pub async fn get_attempt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> crate::error::Result<Response> {
    let attempt = state.attempt_service.get_attempt(id).await?;
    let answers = state.attempt_service.list_answers(id).await?;
    Ok(Json(AttemptResponse::new(attempt, answers)).into_response())
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<SaveAnswerRequest>,
) -> crate::error::Result<Response> {
    state.attempt_service.save_answer(id, req).await?;
    Ok(Json(OkResponse { ok: true }).into_response())
}

#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> crate::error::Result<Response> {
    tracing::info!("Submitting attempt: {}", id);
    match state.attempt_service.submit_attempt(id).await {
        Ok(result) => {
            tracing::info!(
                "Attempt graded: id={}, score={}/{}",
                id,
                result.score,
                result.details.len()
            );
            Ok(Json(result).into_response())
        }
        Err(e) => {
            tracing::warn!("Failed to submit attempt {}: {}", id, e);
            Err(e)
        }
    }
}

#[axum::debug_handler]
pub async fn track_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<TrackEventRequest>,
) -> crate::error::Result<Response> {
    state.attempt_service.record_event(id, req.event).await?;
    Ok((StatusCode::CREATED, Json(OkResponse { ok: true })).into_response())
}

#[axum::debug_handler]
pub async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> crate::error::Result<Response> {
    let events = state.attempt_service.list_events(id).await?;
    let body: Vec<AttemptEventResponse> = events.into_iter().map(Into::into).collect();
    Ok(Json(body).into_response())
}
