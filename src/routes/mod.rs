pub mod attempt;
pub mod health;
pub mod question;
pub mod quiz;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    auth::require_api_token,
    rate_limit::{self, RateLimiter},
};
use crate::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// The full HTTP surface: `/health` is open, everything else needs the
/// bearer token. `rps` is the per-second budget of each attempt and of the
/// remaining API as a whole.
pub fn app(state: AppState, rps: u32) -> Router {
    let base_routes = Router::new().route("/health", get(health::health));

    let api = Router::new()
        .route("/quizzes", get(quiz::list_quizzes).post(quiz::create_quiz))
        .route("/quizzes/:id", get(quiz::get_quiz).patch(quiz::update_quiz))
        .route("/quizzes/:id/questions", post(quiz::create_question))
        .route(
            "/questions/:id",
            patch(question::update_question).delete(question::delete_question),
        )
        .route("/attempts", post(attempt::start_attempt))
        .route("/attempts/:id", get(attempt::get_attempt))
        .route("/attempts/:id/answer", post(attempt::save_answer))
        .route("/attempts/:id/submit", post(attempt::submit_attempt))
        .route(
            "/attempts/:id/events",
            get(attempt::list_events).post(attempt::track_event),
        )
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_api_token,
        ))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(rps),
            rate_limit::rps_middleware,
        ));

    base_routes
        .merge(api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
