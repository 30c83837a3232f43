use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};
use crate::AppState;

const MALFORMED_HEADER: &str = "Missing or invalid Authorization header";

/// Accepts `Authorization: Bearer <token>` matching the configured API token.
pub async fn require_api_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        tracing::warn!("Auth error: missing Authorization header");
        return Err(Error::Unauthorized(MALFORMED_HEADER.to_string()));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        tracing::warn!("Auth error: non-ASCII Authorization header");
        return Err(Error::Unauthorized(MALFORMED_HEADER.to_string()));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        tracing::warn!("Auth error: unsupported authorization scheme");
        return Err(Error::Unauthorized(MALFORMED_HEADER.to_string()));
    };

    let token = token.trim();
    if token.is_empty() || !token_matches(token, &state.api_token) {
        tracing::warn!("Auth error: invalid token attempt on {}", req.uri().path());
        return Err(Error::Unauthorized("Invalid token".to_string()));
    }

    Ok(next.run(req).await)
}

fn token_matches(given: &str, expected: &str) -> bool {
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::token_matches;

    #[test]
    fn token_comparison_is_exact() {
        assert!(token_matches("dev-token", "dev-token"));
        assert!(!token_matches("dev-toke", "dev-token"));
        assert!(!token_matches("DEV-TOKEN", "dev-token"));
    }
}
