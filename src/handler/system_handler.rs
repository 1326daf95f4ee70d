use crate::dto::system_dto::{CleanupResultDto, CleanupStatusDto};
use crate::error::AppError;
use crate::response::app_response::{Enveloped, SuccessResponse};
use crate::state::system_state::SystemState;
use axum::extract::State;
use tracing::info;

pub async fn cleanup_tokens(
    State(state): State<SystemState>,
) -> Result<SuccessResponse<CleanupResultDto>, AppError> {
    info!("SECURITY: Manual token cleanup requested");
    state.cleanup_service.cleanup_expired_tokens().await.enveloped()
}

pub async fn cleanup_status(
    State(state): State<SystemState>,
) -> Result<SuccessResponse<CleanupStatusDto>, AppError> {
    state.cleanup_service.status().await.enveloped()
}
