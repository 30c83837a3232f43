use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use crate::{
    dto::quiz_dto::{QuestionResponse, UpdateQuestionPayload},
    error::Result,
    AppState,
};

#[utoipa::path(
    patch,
    path = "/questions/{id}",
    params(
        ("id" = i64, Path, description = "Question ID")
    ),
    request_body = UpdateQuestionPayload,
    responses(
        (status = 200, description = "Question updated", body = QuestionResponse),
        (status = 400, description = "Invalid update"),
        (status = 404, description = "Question not found")
    )
)]
#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionPayload>,
) -> Result<impl IntoResponse> {
    let question = state.quiz_service.update_question(id, payload).await?;
    Ok(Json(QuestionResponse::from(question)))
}

#[utoipa::path(
    delete,
    path = "/questions/{id}",
    params(
        ("id" = i64, Path, description = "Question ID")
    ),
    responses(
        (status = 204, description = "Question deleted"),
        (status = 404, description = "Question not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.quiz_service.delete_question(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
