use crate::config::logging::secure_log;
use crate::error::{token_error::TokenError, AppError};
use crate::state::auth_state::AuthState;
use axum::extract::State;
use axum::http::{self, HeaderMap, Request};
use axum::{middleware::Next, response::IntoResponse};
use tracing::info;

/// Token after the case-sensitive `Bearer ` prefix, if non-empty
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the bearer token to an `AuthenticatedUser` request extension, or rejects with 401/403
pub async fn auth(
    State(state): State<AuthState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let client_ip = state
        .client_addresses
        .resolve(req.headers(), req.extensions())
        .unwrap_or_else(|| "unknown".to_string());

    let token = bearer_token(req.headers()).ok_or_else(|| {
        secure_log::secure_error!(format!("Missing authorization header from IP: {}", client_ip));
        TokenError::MissingToken
    })?;

    let principal = state.auth_service.validate(token).await.inspect_err(|e| {
        secure_log::secure_error!(format!("Rejected access token from IP: {}", client_ip), e);
    })?;

    info!(
        "SECURITY: Authentication successful for user ID: {} from IP: {}",
        principal.user.id, client_ip
    );
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer abc.def")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Basic xyz")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
