pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::config::Config;
use crate::services::{attempt_service::AttemptService, quiz_service::QuizService};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub api_token: Arc<str>,
    pub quiz_service: QuizService,
    pub attempt_service: AttemptService,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        let quiz_service = QuizService::new(pool.clone());
        let attempt_service = AttemptService::new(pool.clone());

        Self {
            pool,
            api_token: Arc::from(config.api_token.as_str()),
            quiz_service,
            attempt_service,
        }
    }
}
