use crate::error::store_error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key namespaces. Prefix invalidation scans every key, which is acceptable for the
/// in-process map but would need per-entity key lists on a shared cache at scale.
pub const ACCESS_TOKEN_NAMESPACE: &str = "token:access:";
pub const REFRESH_TOKEN_NAMESPACE: &str = "token:refresh:";
pub const MENU_NAMESPACE: &str = "menu:";

/// Advisory key/value cache. Never the source of truth: callers absorb every error.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;
    async fn invalidate(&self, key: &str) -> Result<(), StoreError>;
    /// Drop every key under `namespace`; returns how many were removed
    async fn invalidate_prefix(&self, namespace: &str) -> Result<usize, StoreError>;
    /// Drop entries whose TTL has elapsed
    async fn purge_expired(&self) -> Result<usize, StoreError>;
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-process cache using DashMap with per-entry expiry
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone());

        if hit.is_none() {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Ok(());
        }
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn invalidate_prefix(&self, namespace: &str) -> Result<usize, StoreError> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(namespace));
        Ok(before - self.entries.len())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - self.entries.len())
    }
}
