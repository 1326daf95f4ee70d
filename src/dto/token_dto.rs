use crate::entity::user::UserStatus;
use serde::{Deserialize, Serialize};

/// Discriminates the two halves of a pair so one can never stand in for the other
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenClaimsDto {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub status: UserStatus,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub jti: String, // unique per issuance, so two tokens minted in the same second still differ
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Identity half of the claims, supplied by the caller of the issuer
#[derive(Clone, Debug)]
pub struct TokenSubject {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub status: UserStatus,
}

/// A freshly signed token and its expiry
#[derive(Clone, Debug)]
pub struct SignedTokenDto {
    pub token: String,
    pub iat: i64,
    pub exp: i64,
}
