use super::{auth, health, menu, system};
use crate::app::AppContext;
use crate::state::auth_state::AuthState;
use crate::state::health_state::HealthState;
use crate::state::menu_state::MenuState;
use crate::state::system_state::SystemState;
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn routes(context: &AppContext) -> Router {
    let auth_state = AuthState::new(
        context.auth_service.clone(),
        context.login_rate_limit.clone(),
        context.client_addresses,
    );
    let menu_state = MenuState::new(context.auth_service.clone(), context.menu_authorizer.clone());
    let system_state = SystemState::new(context.cleanup_service.clone(), context.operator_key.clone());
    let health_state = HealthState::new(context.credentials.clone(), context.tokens.clone(), context.backend);

    let merged_router = auth::routes(auth_state.clone())
        .merge(menu::routes(menu_state, auth_state))
        .merge(system::routes(system_state))
        .merge(health::routes(health_state));

    Router::new()
        .nest("/api", merged_router)
        .layer(TraceLayer::new_for_http())
}
