use crate::handler::auth_handler;
use crate::middleware::{auth as auth_middleware, rate_limit};
use crate::state::auth_state::AuthState;
use axum::routing::{get, post};
use axum::{middleware, Router};

pub fn routes(state: AuthState) -> Router {
    let login = Router::new()
        .route("/auth/login", post(auth_handler::login))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::rate_limit_login));

    let protected = Router::new()
        .route("/auth/me", get(auth_handler::me))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware::auth));

    // Logout resolves its own bearer token so that stale tokens can still log out
    Router::new()
        .merge(login)
        .merge(protected)
        .route("/auth/refresh", post(auth_handler::refresh))
        .route("/auth/logout", post(auth_handler::logout))
        .with_state(state)
}
