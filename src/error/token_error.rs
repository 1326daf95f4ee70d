use crate::response::app_response::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Missing Bearer token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Token has expired")]
    Expired,
    #[error("Token has been revoked")]
    Revoked,
    #[error("Wrong token type")]
    WrongTokenType,
    #[error("Token error: {0}")]
    TokenCreation(String),
}

impl TokenError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TokenError::TokenCreation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        ErrorResponse::send(self.to_string()).with_status(status_code).into_response()
    }
}
