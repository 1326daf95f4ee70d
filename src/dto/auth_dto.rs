use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

#[derive(Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_identifier"))]
pub struct LoginRequestDto {
    #[validate(length(
        min = 1,
        max = 64,
        message = "Username must be between 1 and 64 characters"
    ))]
    pub username: Option<String>,
    #[validate(email(message = "Email format is invalid"))]
    #[validate(length(
        max = 254,
        message = "Email must not exceed 254 characters"
    ))]
    pub email: Option<String>,
    #[validate(length(
        min = 1,
        max = 128,
        message = "Password is required"
    ))]
    pub password: String,
}

impl LoginRequestDto {
    /// Username wins when both are supplied
    pub fn identifier(&self) -> Option<&str> {
        self.username
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.email.as_deref().filter(|s| !s.is_empty()))
    }
}

fn validate_identifier(dto: &LoginRequestDto) -> Result<(), ValidationError> {
    match dto.identifier() {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("IDENTIFIER_REQUIRED")
            .with_message(Cow::Borrowed("Either username or email is required"))),
    }
}

impl std::fmt::Debug for LoginRequestDto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish()
    }
}

/// Login and refresh both answer with this shape
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairDto {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_in: i64,
    pub refresh_token_expires_in: i64,
    pub token_type: String,
}

#[derive(Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequestDto {
    #[validate(length(
        min = 1,
        message = "Refresh token is required"
    ))]
    pub refresh_token: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogoutResponseDto {
    pub message: String,
}
