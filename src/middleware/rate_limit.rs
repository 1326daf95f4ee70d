use crate::response::app_response::ErrorResponse;
use crate::state::auth_state::AuthState;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const SWEEP_EVERY: usize = 100;
const UNRESOLVED_CLIENT: &str = "unresolved";

/// Sliding-window login throttle keyed by client address
#[derive(Clone)]
pub struct LoginRateLimiter {
    attempts: Arc<DashMap<String, Vec<Instant>>>,
    max_attempts: usize,
    window: Duration,
}

impl LoginRateLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            window,
        }
    }

    /// Records an attempt; false once the address has used up its window
    pub fn try_acquire(&self, client_ip: &str) -> bool {
        let now = Instant::now();
        let mut attempts = self.attempts.entry(client_ip.to_string()).or_default();

        if let Some(window_start) = now.checked_sub(self.window) {
            attempts.retain(|&at| at > window_start);
        }
        if attempts.len() >= self.max_attempts {
            return false;
        }
        attempts.push(now);
        true
    }

    /// Forget addresses with no attempt in the last two windows
    pub fn sweep(&self) {
        let Some(cutoff) = Instant::now().checked_sub(self.window * 2) else {
            return;
        };
        self.attempts.retain(|_, attempts| {
            attempts.retain(|&at| at > cutoff);
            !attempts.is_empty()
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.attempts.len()
    }
}

/// Throttles `POST /auth/login` per client address
pub async fn rate_limit_login(
    State(state): State<AuthState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // Callers with no resolvable address share one bucket
    let client_ip = state
        .client_addresses
        .resolve(req.headers(), req.extensions())
        .unwrap_or_else(|| UNRESOLVED_CLIENT.to_string());

    let limiter = &state.login_rate_limit;
    if !limiter.try_acquire(&client_ip) {
        if cfg!(debug_assertions) {
            tracing::warn!("SECURITY: Login rate limit exceeded for IP: {}", client_ip);
        } else {
            tracing::warn!("SECURITY: Login rate limit exceeded");
        }
        return ErrorResponse::send("Too many login attempts. Please try again later.".to_string())
            .with_status(StatusCode::TOO_MANY_REQUESTS)
            .into_response();
    }

    if limiter.tracked_clients() % SWEEP_EVERY == 0 {
        limiter.sweep();
    }

    next.run(req).await
}
