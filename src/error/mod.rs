pub mod authorization_error;
pub mod credential_error;
pub mod request_error;
pub mod store_error;
pub mod token_error;

use crate::config::logging::secure_log;
use crate::response::app_response::ErrorResponse;
use axum::http::StatusCode;

// Unified application error type
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Authorization(#[from] authorization_error::AuthorizationError),
    #[error(transparent)]
    Token(#[from] token_error::TokenError),
    #[error(transparent)]
    Credential(#[from] credential_error::CredentialError),
    #[error(transparent)]
    Store(#[from] store_error::StoreError),
    #[error(transparent)]
    Request(#[from] request_error::RequestError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        AppError::Store(store_error::StoreError::from(error))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Authorization(e) => e.status_code(),
            AppError::Token(e) => e.status_code(),
            AppError::Credential(e) => e.status_code(),
            AppError::Request(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::Authorization(e) => e.into_response(),
            AppError::Token(e) => e.into_response(),
            AppError::Credential(e) => e.into_response(),
            AppError::Request(e) => e.into_response(),
            internal => {
                // Internals never reach the client; the id ties the response to the log line
                let error_id = uuid::Uuid::new_v4();
                secure_log::secure_error!(format!("Internal error [{}]", error_id), internal);
                ErrorResponse::send("Internal server error".to_string())
                    .with_meta(serde_json::json!({ "errorId": error_id.to_string() }))
                    .with_status(internal.status_code())
                    .into_response()
            }
        }
    }
}
