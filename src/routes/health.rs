use crate::handler::health_handler;
use crate::state::health_state::HealthState;
use axum::{routing::get, Router};

pub fn routes(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler::health_check))
        .with_state(state)
}
