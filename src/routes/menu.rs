use crate::handler::menu_handler;
use crate::middleware::auth as auth_middleware;
use crate::state::auth_state::AuthState;
use crate::state::menu_state::MenuState;
use axum::routing::get;
use axum::{middleware, Router};

pub fn routes(state: MenuState, auth_state: AuthState) -> Router {
    Router::new()
        .route("/menus/tree", get(menu_handler::tree))
        .route("/menus/paths", get(menu_handler::paths))
        .route_layer(middleware::from_fn_with_state(auth_state, auth_middleware::auth))
        .with_state(state)
}
