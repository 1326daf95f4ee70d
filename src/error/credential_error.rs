use crate::response::app_response::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Account is disabled")]
    AccountDisabled,
    #[error("Account is locked")]
    AccountLocked,
}

impl CredentialError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CredentialError::UserNotFound => StatusCode::NOT_FOUND,
            CredentialError::InvalidPassword => StatusCode::UNAUTHORIZED,
            CredentialError::AccountDisabled => StatusCode::FORBIDDEN,
            CredentialError::AccountLocked => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for CredentialError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        ErrorResponse::send(self.to_string()).with_status(status_code).into_response()
    }
}
