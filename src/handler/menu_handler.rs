use crate::dto::menu_dto::MenuTreeNodeDto;
use crate::error::AppError;
use crate::response::app_response::{Enveloped, SuccessResponse};
use crate::service::auth_service::AuthenticatedUser;
use crate::state::menu_state::MenuState;
use axum::extract::State;
use axum::Extension;

pub async fn tree(
    State(state): State<MenuState>,
    Extension(principal): Extension<AuthenticatedUser>,
) -> Result<SuccessResponse<Vec<MenuTreeNodeDto>>, AppError> {
    let role_ids = state.auth_service.role_ids(principal.user.id).await?;
    state.menu_authorizer.get_authorized_tree(&role_ids).await.enveloped()
}

pub async fn paths(
    State(state): State<MenuState>,
    Extension(principal): Extension<AuthenticatedUser>,
) -> Result<SuccessResponse<Vec<String>>, AppError> {
    let role_ids = state.auth_service.role_ids(principal.user.id).await?;
    state.menu_authorizer.get_authorized_paths(&role_ids).await.enveloped()
}
