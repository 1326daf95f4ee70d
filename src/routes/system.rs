use crate::handler::system_handler;
use crate::middleware::operator_key;
use crate::state::system_state::SystemState;
use axum::routing::{get, post};
use axum::{middleware, Router};

pub fn routes(state: SystemState) -> Router {
    Router::new()
        .route("/system/cleanup/tokens", post(system_handler::cleanup_tokens))
        .route("/system/cleanup/status", get(system_handler::cleanup_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), operator_key::require_operator_key))
        .with_state(state)
}
