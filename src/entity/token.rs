use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One issued token pair. Token values are kept as SHA-256 digests.
#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct TokenRecord {
    pub id: i64,
    pub user_id: i64,
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub token_type: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TokenRecord {
    #[inline]
    pub fn is_access_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.access_token_expires_at
    }

    #[inline]
    pub fn is_refresh_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.refresh_token_expires_at
    }

    /// Eligible for the cleanup sweep only once both lifetimes are over
    #[inline]
    pub fn is_fully_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_access_expired(now) && self.is_refresh_expired(now)
    }
}

/// Fields supplied by the caller when a new pair is persisted
#[derive(Clone, Debug)]
pub struct NewTokenRecord {
    pub user_id: i64,
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub token_type: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Replacement values written by a rotation
#[derive(Clone, Debug)]
pub struct TokenRotation {
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub client_ip: Option<String>,
}

/// Aggregate counts over the token table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, sqlx::FromRow)]
pub struct TokenStats {
    pub total_tokens: i64,
    pub expired_tokens: i64,
    pub revoked_tokens: i64,
}
