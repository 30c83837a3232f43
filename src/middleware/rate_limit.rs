use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{http::StatusCode, Json};
use serde_json::json;

const WINDOW: Duration = Duration::from_secs(1);
const MAX_TRACKED_KEYS: usize = 4096;

/// Which budget a request draws from. Everything under `/attempts/:id`
/// is charged to that attempt, so one taker flooding answers or anti-cheat
/// events cannot starve the others; the rest of the API shares one budget.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LimitKey {
    Attempt(i64),
    Api,
}

impl LimitKey {
    pub fn for_path(path: &str) -> Self {
        let mut segments = path.trim_start_matches('/').split('/');
        match (segments.next(), segments.next()) {
            (Some("attempts"), Some(id)) => id.parse().map(LimitKey::Attempt).unwrap_or(LimitKey::Api),
            _ => LimitKey::Api,
        }
    }
}

#[derive(Debug)]
struct Window {
    start: Instant,
    count: u32,
}

/// Fixed one-second windows, one per [`LimitKey`].
#[derive(Clone, Debug)]
pub struct RateLimiter {
    rps: u32,
    windows: Arc<Mutex<HashMap<LimitKey, Window>>>,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Self {
        Self {
            rps: rps.max(1),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn allow(&self, key: LimitKey) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: LimitKey, now: Instant) -> bool {
        // A poisoned lock only means another request panicked mid-count
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        if windows.len() >= MAX_TRACKED_KEYS {
            windows.retain(|_, w| now.duration_since(w.start) < WINDOW);
        }

        let window = windows.entry(key).or_insert(Window { start: now, count: 0 });
        if now.duration_since(window.start) >= WINDOW {
            window.start = now;
            window.count = 0;
        }
        if window.count < self.rps {
            window.count += 1;
            true
        } else {
            false
        }
    }
}

pub async fn rps_middleware(State(limiter): State<RateLimiter>, req: Request, next: Next) -> Response {
    let key = LimitKey::for_path(req.uri().path());
    if !limiter.allow(key.clone()) {
        tracing::warn!(?key, path = %req.uri().path(), "rate limit exceeded");
        let message = match key {
            LimitKey::Attempt(_) => "Too many requests for this attempt",
            LimitKey::Api => "Too many requests",
        };
        return (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": message }))).into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_routes_are_keyed_by_attempt_id() {
        assert_eq!(LimitKey::for_path("/attempts/7/events"), LimitKey::Attempt(7));
        assert_eq!(LimitKey::for_path("/attempts/7"), LimitKey::Attempt(7));
        assert_eq!(LimitKey::for_path("/attempts"), LimitKey::Api);
        assert_eq!(LimitKey::for_path("/attempts/abc/submit"), LimitKey::Api);
        assert_eq!(LimitKey::for_path("/quizzes/7"), LimitKey::Api);
    }

    #[test]
    fn each_key_gets_its_own_window() {
        let limiter = RateLimiter::new(2);
        let now = Instant::now();
        assert!(limiter.allow_at(LimitKey::Attempt(1), now));
        assert!(limiter.allow_at(LimitKey::Attempt(1), now));
        assert!(!limiter.allow_at(LimitKey::Attempt(1), now));

        assert!(limiter.allow_at(LimitKey::Attempt(2), now));
        assert!(limiter.allow_at(LimitKey::Api, now));

        assert!(limiter.allow_at(LimitKey::Attempt(1), now + WINDOW));
    }

    #[test]
    fn zero_rps_still_admits_one_request() {
        let limiter = RateLimiter::new(0);
        assert!(limiter.allow(LimitKey::Api));
        assert!(!limiter.allow(LimitKey::Api));
    }

    #[test]
    fn expired_windows_are_pruned_when_the_table_is_full() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();
        for id in 0..MAX_TRACKED_KEYS as i64 {
            limiter.allow_at(LimitKey::Attempt(id), start);
        }
        limiter.allow_at(LimitKey::Api, start + WINDOW);
        let tracked = limiter.windows.lock().unwrap().len();
        assert_eq!(tracked, 1);
    }
}
