use crate::config::parameter;
use crate::entity::token::{NewTokenRecord, TokenRecord, TokenRotation, TokenStats};
use crate::error::store_error::StoreError;
use crate::repository::token_repository::TokenRepository;
use crate::service::cache_service::{Cache, ACCESS_TOKEN_NAMESPACE, REFRESH_TOKEN_NAMESPACE};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Why a presented token did not match a usable record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidReason {
    NotFound,
    Revoked,
    Expired,
}

#[derive(Clone, Debug)]
pub enum TokenValidity {
    Valid(TokenRecord),
    Invalid(InvalidReason),
}

impl TokenValidity {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenValidity::Valid(_))
    }

    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            TokenValidity::Valid(_) => None,
            TokenValidity::Invalid(reason) => Some(*reason),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Side {
    Access,
    Refresh,
}

impl Side {
    fn cache_key(self, hash: &str) -> String {
        match self {
            Side::Access => format!("{ACCESS_TOKEN_NAMESPACE}{hash}"),
            Side::Refresh => format!("{REFRESH_TOKEN_NAMESPACE}{hash}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TokenStoreConfig {
    /// Upper bound for cached lookups; clamped to the shorter token lifetime
    pub cache_ttl: Duration,
}

impl TokenStoreConfig {
    pub fn from_parameters(access_ttl_seconds: i64, refresh_ttl_seconds: i64) -> Self {
        let configured = parameter::get_u64("TOKEN_CACHE_TTL_SECONDS");
        Self::clamped(configured, access_ttl_seconds, refresh_ttl_seconds)
    }

    pub fn clamped(cache_ttl_seconds: u64, access_ttl_seconds: i64, refresh_ttl_seconds: i64) -> Self {
        let shortest = access_ttl_seconds.min(refresh_ttl_seconds).max(0) as u64;
        Self {
            cache_ttl: Duration::from_secs(cache_ttl_seconds.min(shortest)),
        }
    }
}

/// SHA-256 hex digest; the only form in which token values are stored or cached
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());

    let mut hex_string = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex_string, "{:02x}", byte);
    }
    hex_string
}

/// Authoritative token pair state, with a read-through cache in front of it.
///
/// Every write evicts the affected cache keys before returning. Cache failures are logged
/// and otherwise ignored.
///
/// A read that raced a write must not leave its stale copy behind: writes bump `writes`
/// after touching the repository, and a fill that sees the counter move drops its own key.
#[derive(Clone)]
pub struct TokenStore {
    repository: Arc<dyn TokenRepository>,
    cache: Arc<dyn Cache>,
    config: TokenStoreConfig,
    writes: Arc<AtomicU64>,
}

impl TokenStore {
    pub fn new(repository: Arc<dyn TokenRepository>, cache: Arc<dyn Cache>, config: TokenStoreConfig) -> Self {
        Self {
            repository,
            cache,
            config,
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// New rows are looked up on demand, so nothing is evicted here
    pub async fn create(&self, record: NewTokenRecord) -> Result<TokenRecord, StoreError> {
        let stored = self.repository.insert(record).await?;
        info!("SECURITY: Token pair {} stored for user ID: {}", stored.id, stored.user_id);
        Ok(stored)
    }

    pub async fn validate_access(&self, access_token: &str) -> Result<TokenValidity, StoreError> {
        let record = self.lookup(Side::Access, &hash_token(access_token)).await?;
        Ok(Self::judge(record, |record, now| record.is_access_expired(now)))
    }

    pub async fn validate_refresh(&self, refresh_token: &str) -> Result<TokenValidity, StoreError> {
        let record = self.lookup(Side::Refresh, &hash_token(refresh_token)).await?;
        Ok(Self::judge(record, |record, now| record.is_refresh_expired(now)))
    }

    /// Record for a presented access token, whatever its state
    pub async fn find_by_access_token(&self, access_token: &str) -> Result<Option<TokenRecord>, StoreError> {
        self.lookup(Side::Access, &hash_token(access_token)).await
    }

    /// Replace both token values and expiries on the row holding `old_refresh_token`.
    ///
    /// `Ok(None)` means no row matched: the token was already rotated (replay, or a lost
    /// race with a concurrent refresh), revoked, or never existed.
    pub async fn rotate(
        &self,
        old_refresh_token: &str,
        new_access_token: &str,
        new_refresh_token: &str,
        expiries: (DateTime<Utc>, DateTime<Utc>),
        client_ip: Option<String>,
    ) -> Result<Option<TokenRecord>, StoreError> {
        let old_refresh_hash = hash_token(old_refresh_token);
        let previous = self.repository.find_by_refresh_hash(&old_refresh_hash).await?;

        let rotation = TokenRotation {
            access_token_hash: hash_token(new_access_token),
            refresh_token_hash: hash_token(new_refresh_token),
            access_token_expires_at: expiries.0,
            refresh_token_expires_at: expiries.1,
            client_ip,
        };
        let rotated = self.repository.rotate(&old_refresh_hash, rotation).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        self.evict_key(Side::Refresh.cache_key(&old_refresh_hash)).await;
        if let Some(previous) = &previous {
            self.evict(previous).await;
        }

        match &rotated {
            Some(record) => info!("SECURITY: Token pair {} rotated for user ID: {}", record.id, record.user_id),
            None => warn!("SECURITY: Rotation found no live row for presented refresh token"),
        }
        Ok(rotated)
    }

    pub async fn revoke(&self, id: i64) -> Result<Option<TokenRecord>, StoreError> {
        let revoked = self.repository.revoke(id, Utc::now()).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(record) = &revoked {
            self.evict(record).await;
            info!("SECURITY: Token pair {} revoked for user ID: {}", record.id, record.user_id);
        }
        Ok(revoked)
    }

    pub async fn revoke_all_for_user(&self, user_id: i64) -> Result<usize, StoreError> {
        let revoked = self.repository.revoke_all_for_user(user_id, Utc::now()).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        for record in &revoked {
            self.evict(record).await;
        }
        info!("SECURITY: Revoked {} token pair(s) for user ID: {}", revoked.len(), user_id);
        Ok(revoked.len())
    }

    /// Delete rows whose access and refresh expiries have both passed
    pub async fn cleanup_expired(&self) -> Result<u64, StoreError> {
        let deleted = self.repository.delete_expired(Utc::now()).await?;
        // Deleted rows were past both expiries, so any cached copy already judges as Expired
        if let Err(e) = self.cache.purge_expired().await {
            warn!("Cache purge after token cleanup failed: {}", e);
        }
        Ok(deleted)
    }

    pub async fn stats(&self) -> Result<TokenStats, StoreError> {
        self.repository.stats(Utc::now()).await
    }

    fn judge(record: Option<TokenRecord>, expired: impl Fn(&TokenRecord, DateTime<Utc>) -> bool) -> TokenValidity {
        let Some(record) = record else {
            return TokenValidity::Invalid(InvalidReason::NotFound);
        };
        if record.is_revoked {
            return TokenValidity::Invalid(InvalidReason::Revoked);
        }
        if expired(&record, Utc::now()) {
            return TokenValidity::Invalid(InvalidReason::Expired);
        }
        TokenValidity::Valid(record)
    }

    async fn lookup(&self, side: Side, hash: &str) -> Result<Option<TokenRecord>, StoreError> {
        let key = side.cache_key(hash);

        match self.cache.get(&key).await {
            Ok(Some(cached)) => match serde_json::from_str::<TokenRecord>(&cached) {
                Ok(record) => return Ok(Some(record)),
                Err(e) => warn!("Discarding undecodable cached token record: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("Token cache read failed, falling back to store: {}", e),
        }

        let seen = self.writes.load(Ordering::SeqCst);
        let record = match side {
            Side::Access => self.repository.find_by_access_hash(hash).await?,
            Side::Refresh => self.repository.find_by_refresh_hash(hash).await?,
        };

        if let Some(record) = &record {
            match serde_json::to_string(record) {
                Ok(encoded) => {
                    if let Err(e) = self.cache.set(&key, encoded, self.config.cache_ttl).await {
                        warn!("Token cache write failed: {}", e);
                    } else if self.writes.load(Ordering::SeqCst) != seen {
                        self.evict_key(key).await;
                    }
                }
                Err(e) => warn!("Token record could not be encoded for cache: {}", e),
            }
        }
        Ok(record)
    }

    async fn evict(&self, record: &TokenRecord) {
        self.evict_key(Side::Access.cache_key(&record.access_token_hash)).await;
        self.evict_key(Side::Refresh.cache_key(&record.refresh_token_hash)).await;
    }

    async fn evict_key(&self, key: String) {
        if let Err(e) = self.cache.invalidate(&key).await {
            warn!("Token cache invalidation failed for a key: {}", e);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::repository::memory::InMemoryTokenRepository;
    use crate::service::cache_service::InMemoryCache;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    /// Cache whose every call fails, to prove the store ignores it
    pub(crate) struct BrokenCache;

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Cache("down".to_string()))
        }
        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), StoreError> {
            Err(StoreError::Cache("down".to_string()))
        }
        async fn invalidate(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Cache("down".to_string()))
        }
        async fn invalidate_prefix(&self, _namespace: &str) -> Result<usize, StoreError> {
            Err(StoreError::Cache("down".to_string()))
        }
        async fn purge_expired(&self) -> Result<usize, StoreError> {
            Err(StoreError::Cache("down".to_string()))
        }
    }

    /// Reads the row, then stalls before returning it on the first access lookup
    struct StallingRepository {
        inner: Arc<InMemoryTokenRepository>,
        stalled: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl TokenRepository for StallingRepository {
        async fn insert(&self, record: NewTokenRecord) -> Result<TokenRecord, StoreError> {
            self.inner.insert(record).await
        }
        async fn find_by_access_hash(&self, access_token_hash: &str) -> Result<Option<TokenRecord>, StoreError> {
            let found = self.inner.find_by_access_hash(access_token_hash).await;
            if !self.stalled.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            found
        }
        async fn find_by_refresh_hash(&self, refresh_token_hash: &str) -> Result<Option<TokenRecord>, StoreError> {
            self.inner.find_by_refresh_hash(refresh_token_hash).await
        }
        async fn rotate(&self, old_refresh_token_hash: &str, rotation: TokenRotation) -> Result<Option<TokenRecord>, StoreError> {
            self.inner.rotate(old_refresh_token_hash, rotation).await
        }
        async fn revoke(&self, id: i64, at: DateTime<Utc>) -> Result<Option<TokenRecord>, StoreError> {
            self.inner.revoke(id, at).await
        }
        async fn revoke_all_for_user(&self, user_id: i64, at: DateTime<Utc>) -> Result<Vec<TokenRecord>, StoreError> {
            self.inner.revoke_all_for_user(user_id, at).await
        }
        async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
            self.inner.delete_expired(now).await
        }
        async fn stats(&self, now: DateTime<Utc>) -> Result<TokenStats, StoreError> {
            self.inner.stats(now).await
        }
    }

    fn store_with(cache: Arc<dyn Cache>) -> (TokenStore, Arc<InMemoryTokenRepository>) {
        let repository = InMemoryTokenRepository::new_shared();
        let store = TokenStore::new(
            repository.clone(),
            cache,
            TokenStoreConfig::clamped(300, 7200, 604800),
        );
        (store, repository)
    }

    fn new_record(access: &str, refresh: &str) -> NewTokenRecord {
        let now = Utc::now();
        NewTokenRecord {
            user_id: 1,
            access_token_hash: hash_token(access),
            refresh_token_hash: hash_token(refresh),
            access_token_expires_at: now + ChronoDuration::hours(2),
            refresh_token_expires_at: now + ChronoDuration::days(7),
            token_type: "Bearer".to_string(),
            client_ip: Some("127.0.0.1".to_string()),
            user_agent: None,
        }
    }

    fn expiries() -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now + ChronoDuration::hours(2), now + ChronoDuration::days(7))
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("abc"));
        assert_ne!(hash, hash_token("abd"));
    }

    #[test]
    fn test_cache_ttl_clamped_to_shorter_lifetime() {
        assert_eq!(TokenStoreConfig::clamped(300, 60, 3600).cache_ttl, Duration::from_secs(60));
        assert_eq!(TokenStoreConfig::clamped(300, 7200, 3600).cache_ttl, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_validate_reasons() {
        let (store, repository) = store_with(InMemoryCache::new_shared());
        let created = store.create(new_record("access-1", "refresh-1")).await.unwrap();

        assert!(store.validate_access("access-1").await.unwrap().is_valid());
        assert!(store.validate_refresh("refresh-1").await.unwrap().is_valid());
        assert_eq!(
            store.validate_access("unknown").await.unwrap().reason(),
            Some(InvalidReason::NotFound)
        );

        // Access lifetime over, refresh still alive
        let past = Utc::now() - ChronoDuration::minutes(1);
        repository.set_expiries(created.id, past, Utc::now() + ChronoDuration::days(1));
        store.evict(&created).await;
        assert_eq!(
            store.validate_access("access-1").await.unwrap().reason(),
            Some(InvalidReason::Expired)
        );
        assert!(store.validate_refresh("refresh-1").await.unwrap().is_valid());

        store.revoke(created.id).await.unwrap();
        assert_eq!(
            store.validate_refresh("refresh-1").await.unwrap().reason(),
            Some(InvalidReason::Revoked)
        );
    }

    #[tokio::test]
    async fn test_rotation_evicts_cached_predecessor() {
        let (store, _) = store_with(InMemoryCache::new_shared());
        store.create(new_record("access-1", "refresh-1")).await.unwrap();

        // Warm the cache for both old values
        assert!(store.validate_access("access-1").await.unwrap().is_valid());
        assert!(store.validate_refresh("refresh-1").await.unwrap().is_valid());

        let rotated = store
            .rotate("refresh-1", "access-2", "refresh-2", expiries(), None)
            .await
            .unwrap();
        assert!(rotated.is_some());

        assert_eq!(store.validate_access("access-1").await.unwrap().reason(), Some(InvalidReason::NotFound));
        assert_eq!(store.validate_refresh("refresh-1").await.unwrap().reason(), Some(InvalidReason::NotFound));
        assert!(store.validate_access("access-2").await.unwrap().is_valid());

        // Replaying the old refresh token finds nothing
        let replay = store
            .rotate("refresh-1", "access-3", "refresh-3", expiries(), None)
            .await
            .unwrap();
        assert!(replay.is_none());
    }

    #[tokio::test]
    async fn test_lookup_racing_revoke_does_not_cache_stale_record() {
        let repository = Arc::new(StallingRepository {
            inner: InMemoryTokenRepository::new_shared(),
            stalled: std::sync::atomic::AtomicBool::new(false),
        });
        let store = TokenStore::new(
            repository,
            InMemoryCache::new_shared(),
            TokenStoreConfig::clamped(300, 7200, 604800),
        );
        let created = store.create(new_record("access-1", "refresh-1")).await.unwrap();

        // The lookup reads the live row, then the revoke lands while it is stalled
        let (during, _) = tokio::join!(store.validate_access("access-1"), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            store.revoke(created.id).await.unwrap()
        });
        assert!(during.unwrap().is_valid());

        assert_eq!(
            store.validate_access("access-1").await.unwrap().reason(),
            Some(InvalidReason::Revoked)
        );
    }

    #[tokio::test]
    async fn test_revoke_evicts_cached_record() {
        let (store, _) = store_with(InMemoryCache::new_shared());
        let created = store.create(new_record("access-1", "refresh-1")).await.unwrap();
        assert!(store.validate_access("access-1").await.unwrap().is_valid());

        store.revoke(created.id).await.unwrap();
        assert_eq!(store.validate_access("access-1").await.unwrap().reason(), Some(InvalidReason::Revoked));
    }

    #[tokio::test]
    async fn test_broken_cache_never_fails_operations() {
        let (store, _) = store_with(Arc::new(BrokenCache));
        let created = store.create(new_record("access-1", "refresh-1")).await.unwrap();

        assert!(store.validate_access("access-1").await.unwrap().is_valid());
        assert!(store.rotate("refresh-1", "access-2", "refresh-2", expiries(), None).await.unwrap().is_some());
        assert!(store.revoke(created.id).await.unwrap().is_some());
        assert_eq!(store.cleanup_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_rows_with_live_refresh() {
        let (store, repository) = store_with(InMemoryCache::new_shared());
        let half = store.create(new_record("access-1", "refresh-1")).await.unwrap();
        let dead = store.create(new_record("access-2", "refresh-2")).await.unwrap();
        store.create(new_record("access-3", "refresh-3")).await.unwrap();

        let past = Utc::now() - ChronoDuration::minutes(5);
        repository.set_expiries(half.id, past, Utc::now() + ChronoDuration::days(1));
        repository.set_expiries(dead.id, past, past);

        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        assert_eq!(repository.len(), 2);
        assert!(store.validate_refresh("refresh-1").await.unwrap().is_valid());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_tokens, 2);
        assert_eq!(stats.expired_tokens, 0);
    }

    #[tokio::test]
    async fn test_revoke_all_for_user() {
        let (store, _) = store_with(InMemoryCache::new_shared());
        store.create(new_record("access-1", "refresh-1")).await.unwrap();
        store.create(new_record("access-2", "refresh-2")).await.unwrap();

        assert_eq!(store.revoke_all_for_user(1).await.unwrap(), 2);
        assert_eq!(store.validate_access("access-2").await.unwrap().reason(), Some(InvalidReason::Revoked));
        // Already revoked rows are not counted twice
        assert_eq!(store.revoke_all_for_user(1).await.unwrap(), 0);
    }
}
