use crate::response::app_response::{ErrorResponse, ErrorDetail};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Access denied: {message}")]
    AccessDenied { message: String },
    #[error("Missing or invalid operator key")]
    InvalidOperatorKey,
    #[error("Operator endpoints are not configured")]
    OperatorKeyNotConfigured,
}

impl AuthorizationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthorizationError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            AuthorizationError::InvalidOperatorKey => StatusCode::UNAUTHORIZED,
            AuthorizationError::OperatorKeyNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AuthorizationError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let (message, error_type, details) = match self {
            AuthorizationError::AccessDenied { message } => (
                "Access denied".to_string(),
                "AUTHORIZATION_ERROR".to_string(),
                message,
            ),
            AuthorizationError::InvalidOperatorKey => (
                "Access denied".to_string(),
                "OPERATOR_KEY_ERROR".to_string(),
                "A valid X-Api-Key header is required".to_string(),
            ),
            AuthorizationError::OperatorKeyNotConfigured => (
                "Service unavailable".to_string(),
                "OPERATOR_KEY_ERROR".to_string(),
                "No operator key is configured on this server".to_string(),
            ),
        };

        ErrorResponse::with_error_details(
            message,
            vec![ErrorDetail::new(error_type, details)]
        )
        .with_status(status_code)
        .into_response()
    }
}
