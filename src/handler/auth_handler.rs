use crate::config::logging::secure_log;
use crate::dto::auth_dto::{LoginRequestDto, LogoutResponseDto, RefreshTokenRequestDto, TokenPairDto};
use crate::dto::user_dto::UserProfileDto;
use crate::error::{request_error::ValidatedRequest, token_error::TokenError, AppError};
use crate::middleware::auth::bearer_token;
use crate::response::app_response::{Enveloped, SuccessResponse};
use crate::service::auth_service::{AuthenticatedUser, ClientInfo};
use crate::state::auth_state::AuthState;
use axum::extract::{Query, State};
use axum::http::{Extensions, HeaderMap};
use axum::Extension;
use serde::Deserialize;
use tracing::info;

pub async fn login(
    State(state): State<AuthState>,
    headers: HeaderMap,
    extensions: Extensions,
    ValidatedRequest(payload): ValidatedRequest<LoginRequestDto>,
) -> Result<SuccessResponse<TokenPairDto>, AppError> {
    // The validator guarantees an identifier; this only satisfies the type
    let identifier = payload.identifier().unwrap_or_default();
    secure_log::sensitive_debug!("Login attempt for identifier: {}", identifier);

    state
        .auth_service
        .login(identifier, &payload.password, client_info(&state, &headers, &extensions))
        .await
        .enveloped()
}

pub async fn me(
    State(state): State<AuthState>,
    Extension(principal): Extension<AuthenticatedUser>,
) -> Result<SuccessResponse<UserProfileDto>, AppError> {
    secure_log::sensitive_debug!("Profile accessed for user: {}", principal.user.email);
    state.auth_service.profile(principal.user).await.enveloped()
}

pub async fn refresh(
    State(state): State<AuthState>,
    headers: HeaderMap,
    extensions: Extensions,
    ValidatedRequest(payload): ValidatedRequest<RefreshTokenRequestDto>,
) -> Result<SuccessResponse<TokenPairDto>, AppError> {
    state
        .auth_service
        .refresh(&payload.refresh_token, client_info(&state, &headers, &extensions))
        .await
        .enveloped()
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutParams {
    /// End every session of the token's owner, not just this one
    #[serde(default)]
    pub all: bool,
}

/// Accepts revoked and expired tokens alike, so repeated logouts keep succeeding
pub async fn logout(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Query(params): Query<LogoutParams>,
) -> Result<SuccessResponse<LogoutResponseDto>, AppError> {
    let token = bearer_token(&headers).ok_or(TokenError::MissingToken)?;

    state.auth_service.logout_by_token(token, params.all).await;
    info!("SECURITY: Logout request processed");

    Ok(SuccessResponse::send(LogoutResponseDto {
        message: "Logged out successfully".to_string(),
    }))
}

fn client_info(state: &AuthState, headers: &HeaderMap, extensions: &Extensions) -> ClientInfo {
    ClientInfo {
        ip: state.client_addresses.resolve(headers, extensions),
        user_agent: extract_user_agent(headers),
    }
}

pub(crate) fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("user-agent")
        .and_then(|ua| ua.to_str().ok())
        .map(|ua| ua.to_string())
        .filter(|ua| !ua.is_empty())
}
