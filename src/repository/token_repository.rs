use crate::config::database::{Database, DatabaseTrait};
use crate::config::logging::secure_log;
use crate::entity::token::{NewTokenRecord, TokenRecord, TokenRotation, TokenStats};
use crate::error::store_error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const TOKEN_COLUMNS: &str = "id, user_id, access_token_hash, refresh_token_hash, access_token_expires_at, refresh_token_expires_at, token_type, client_ip, user_agent, is_revoked, revoked_at, created_at, updated_at";

/// Authoritative storage for issued token pairs, keyed by token digests.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn insert(&self, record: NewTokenRecord) -> Result<TokenRecord, StoreError>;
    async fn find_by_access_hash(&self, access_token_hash: &str) -> Result<Option<TokenRecord>, StoreError>;
    async fn find_by_refresh_hash(&self, refresh_token_hash: &str) -> Result<Option<TokenRecord>, StoreError>;
    /// Overwrite the pair in place, matched on the *old* refresh digest.
    /// At most one caller can match a given digest; everyone else gets `None`.
    async fn rotate(&self, old_refresh_token_hash: &str, rotation: TokenRotation) -> Result<Option<TokenRecord>, StoreError>;
    async fn revoke(&self, id: i64, at: DateTime<Utc>) -> Result<Option<TokenRecord>, StoreError>;
    async fn revoke_all_for_user(&self, user_id: i64, at: DateTime<Utc>) -> Result<Vec<TokenRecord>, StoreError>;
    /// Delete rows whose access AND refresh expiries are both before `now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
    async fn stats(&self, now: DateTime<Utc>) -> Result<TokenStats, StoreError>;
}

#[derive(Clone)]
pub struct PgTokenRepository {
    db_conn: Arc<Database>,
}

impl PgTokenRepository {
    pub fn new(db_conn: &Arc<Database>) -> Self {
        Self {
            db_conn: Arc::clone(db_conn),
        }
    }

    async fn find_by(&self, column: &str, hash: &str) -> Result<Option<TokenRecord>, StoreError> {
        let start = std::time::Instant::now();

        let query = format!("SELECT {TOKEN_COLUMNS} FROM user_tokens WHERE {column} = $1");
        match sqlx::query_as::<_, TokenRecord>(&query)
            .bind(hash)
            .fetch_optional(self.db_conn.get_pool())
            .await {
            Ok(record) => {
                secure_log::sensitive_debug!("Token lookup by {} completed in {:?}", column, start.elapsed());
                Ok(record)
            }
            Err(e) => {
                secure_log::secure_error!("Token lookup failed", e);
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn insert(&self, record: NewTokenRecord) -> Result<TokenRecord, StoreError> {
        let query = format!(
            "INSERT INTO user_tokens (user_id, access_token_hash, refresh_token_hash, access_token_expires_at, refresh_token_expires_at, token_type, client_ip, user_agent) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {TOKEN_COLUMNS}"
        );
        sqlx::query_as::<_, TokenRecord>(&query)
            .bind(record.user_id)
            .bind(&record.access_token_hash)
            .bind(&record.refresh_token_hash)
            .bind(record.access_token_expires_at)
            .bind(record.refresh_token_expires_at)
            .bind(&record.token_type)
            .bind(&record.client_ip)
            .bind(&record.user_agent)
            .fetch_one(self.db_conn.get_pool())
            .await
            .map_err(|e| {
                secure_log::secure_error!("Failed to store token pair", e);
                e.into()
            })
    }

    async fn find_by_access_hash(&self, access_token_hash: &str) -> Result<Option<TokenRecord>, StoreError> {
        self.find_by("access_token_hash", access_token_hash).await
    }

    async fn find_by_refresh_hash(&self, refresh_token_hash: &str) -> Result<Option<TokenRecord>, StoreError> {
        self.find_by("refresh_token_hash", refresh_token_hash).await
    }

    async fn rotate(&self, old_refresh_token_hash: &str, rotation: TokenRotation) -> Result<Option<TokenRecord>, StoreError> {
        // One statement: the WHERE clause is the compare, the SET is the swap
        let query = format!(
            "UPDATE user_tokens SET access_token_hash = $1, refresh_token_hash = $2, \
             access_token_expires_at = $3, refresh_token_expires_at = $4, \
             client_ip = COALESCE($5, client_ip), updated_at = NOW() \
             WHERE refresh_token_hash = $6 AND is_revoked = FALSE \
             RETURNING {TOKEN_COLUMNS}"
        );
        sqlx::query_as::<_, TokenRecord>(&query)
            .bind(&rotation.access_token_hash)
            .bind(&rotation.refresh_token_hash)
            .bind(rotation.access_token_expires_at)
            .bind(rotation.refresh_token_expires_at)
            .bind(&rotation.client_ip)
            .bind(old_refresh_token_hash)
            .fetch_optional(self.db_conn.get_pool())
            .await
            .map_err(|e| {
                secure_log::secure_error!("Token rotation failed", e);
                e.into()
            })
    }

    async fn revoke(&self, id: i64, at: DateTime<Utc>) -> Result<Option<TokenRecord>, StoreError> {
        let query = format!(
            "UPDATE user_tokens SET is_revoked = TRUE, revoked_at = COALESCE(revoked_at, $2), updated_at = NOW() \
             WHERE id = $1 RETURNING {TOKEN_COLUMNS}"
        );
        sqlx::query_as::<_, TokenRecord>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(self.db_conn.get_pool())
            .await
            .map_err(|e| {
                secure_log::secure_error!("Token revocation failed", e);
                e.into()
            })
    }

    async fn revoke_all_for_user(&self, user_id: i64, at: DateTime<Utc>) -> Result<Vec<TokenRecord>, StoreError> {
        let query = format!(
            "UPDATE user_tokens SET is_revoked = TRUE, revoked_at = $2, updated_at = NOW() \
             WHERE user_id = $1 AND is_revoked = FALSE RETURNING {TOKEN_COLUMNS}"
        );
        sqlx::query_as::<_, TokenRecord>(&query)
            .bind(user_id)
            .bind(at)
            .fetch_all(self.db_conn.get_pool())
            .await
            .map_err(|e| {
                secure_log::secure_error!("Bulk token revocation failed", e);
                e.into()
            })
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        sqlx::query(
            "DELETE FROM user_tokens WHERE access_token_expires_at < $1 AND refresh_token_expires_at < $1"
        )
        .bind(now)
        .execute(self.db_conn.get_pool())
        .await
        .map(|result| result.rows_affected())
        .map_err(|e| {
            secure_log::secure_error!("Expired token sweep failed", e);
            e.into()
        })
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<TokenStats, StoreError> {
        sqlx::query_as::<_, TokenStats>(
            "SELECT COUNT(*) AS total_tokens, \
             COUNT(*) FILTER (WHERE access_token_expires_at < $1 AND refresh_token_expires_at < $1) AS expired_tokens, \
             COUNT(*) FILTER (WHERE is_revoked) AS revoked_tokens \
             FROM user_tokens"
        )
        .bind(now)
        .fetch_one(self.db_conn.get_pool())
        .await
        .map_err(|e| {
            secure_log::secure_error!("Token statistics query failed", e);
            e.into()
        })
    }
}
