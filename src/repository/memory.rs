//! In-process implementations of the store traits.
//!
//! Backed by `DashMap`, they serve `STORE_BACKEND=memory` deployments (single node,
//! state lost on restart) and the test suite.

use crate::entity::menu::Menu;
use crate::entity::role::Role;
use crate::entity::token::{NewTokenRecord, TokenRecord, TokenRotation, TokenStats};
use crate::entity::user::{User, UserStatus};
use crate::error::store_error::StoreError;
use crate::repository::credential_repository::CredentialStore;
use crate::repository::token_repository::TokenRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

pub struct InMemoryCredentialStore {
    users: DashMap<i64, User>,
    roles: DashMap<i64, Role>,
    user_roles: DashMap<i64, BTreeSet<i64>>,
    menus: DashMap<i64, Menu>,
    role_menus: DashMap<i64, BTreeSet<i64>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            roles: DashMap::new(),
            user_roles: DashMap::new(),
            menus: DashMap::new(),
            role_menus: DashMap::new(),
        }
    }

    /// Create a new instance wrapped in Arc for sharing across threads
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn insert_role(&self, role: Role) {
        self.roles.insert(role.id, role);
    }

    pub fn insert_menu(&self, menu: Menu) {
        self.menus.insert(menu.id, menu);
    }

    pub fn assign_role(&self, user_id: i64, role_id: i64) {
        self.user_roles.entry(user_id).or_default().insert(role_id);
    }

    pub fn grant_menu(&self, role_id: i64, menu_id: i64) {
        self.role_menus.entry(role_id).or_default().insert(menu_id);
    }

    /// Administrative status change; returns false when the user does not exist
    pub fn set_user_status(&self, user_id: i64, status: UserStatus) -> bool {
        match self.users.get_mut(&user_id) {
            Some(mut user) => {
                user.status = status;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let mut matches: Vec<User> = self
            .users
            .iter()
            .filter(|entry| !entry.is_deleted && (entry.username == identifier || entry.email == identifier))
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by_key(|user| user.id);
        Ok(matches.into_iter().next())
    }

    async fn find(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .get(&id)
            .filter(|user| !user.is_deleted)
            .map(|user| user.value().clone()))
    }

    async fn record_login(&self, id: i64, client_ip: Option<&str>, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.login_count += 1;
            user.last_login_at = Some(at);
            user.last_login_ip = client_ip.map(str::to_string);
            user.updated_at = at;
        }
        Ok(())
    }

    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, StoreError> {
        let role_ids = self
            .user_roles
            .get(&user_id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();

        Ok(role_ids
            .iter()
            .filter_map(|id| self.roles.get(id).map(|role| role.value().clone()))
            .filter(|role| role.status == 1)
            .collect())
    }

    async fn list_menus(&self) -> Result<Vec<Menu>, StoreError> {
        Ok(self.menus.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn menu_ids_for_roles(&self, role_ids: &[i64]) -> Result<Vec<i64>, StoreError> {
        let ids: BTreeSet<i64> = role_ids
            .iter()
            .filter_map(|role_id| self.role_menus.get(role_id))
            .flat_map(|menus| menus.value().iter().copied().collect::<Vec<_>>())
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub struct InMemoryTokenRepository {
    records: DashMap<i64, TokenRecord>,
    next_id: AtomicI64,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn find_id(&self, predicate: impl Fn(&TokenRecord) -> bool) -> Option<i64> {
        self.records
            .iter()
            .find(|entry| predicate(entry.value()))
            .map(|entry| *entry.key())
    }

    /// Overwrite stored expiries, for exercising expiry paths
    #[cfg(test)]
    pub(crate) fn set_expiries(&self, id: i64, access: DateTime<Utc>, refresh: DateTime<Utc>) {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.access_token_expires_at = access;
            record.refresh_token_expires_at = refresh;
        }
    }
}

impl Default for InMemoryTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn insert(&self, record: NewTokenRecord) -> Result<TokenRecord, StoreError> {
        let now = Utc::now();
        let stored = TokenRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: record.user_id,
            access_token_hash: record.access_token_hash,
            refresh_token_hash: record.refresh_token_hash,
            access_token_expires_at: record.access_token_expires_at,
            refresh_token_expires_at: record.refresh_token_expires_at,
            token_type: record.token_type,
            client_ip: record.client_ip,
            user_agent: record.user_agent,
            is_revoked: false,
            revoked_at: None,
            created_at: now,
            updated_at: now,
        };
        self.records.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_access_hash(&self, access_token_hash: &str) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self
            .find_id(|record| record.access_token_hash == access_token_hash)
            .and_then(|id| self.records.get(&id).map(|record| record.value().clone())))
    }

    async fn find_by_refresh_hash(&self, refresh_token_hash: &str) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self
            .find_id(|record| record.refresh_token_hash == refresh_token_hash)
            .and_then(|id| self.records.get(&id).map(|record| record.value().clone())))
    }

    async fn rotate(&self, old_refresh_token_hash: &str, rotation: TokenRotation) -> Result<Option<TokenRecord>, StoreError> {
        let Some(id) = self.find_id(|record| record.refresh_token_hash == old_refresh_token_hash) else {
            return Ok(None);
        };

        // Re-check under the entry's write lock; a concurrent rotation may have won
        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(None);
        };
        if record.refresh_token_hash != old_refresh_token_hash || record.is_revoked {
            return Ok(None);
        }

        record.access_token_hash = rotation.access_token_hash;
        record.refresh_token_hash = rotation.refresh_token_hash;
        record.access_token_expires_at = rotation.access_token_expires_at;
        record.refresh_token_expires_at = rotation.refresh_token_expires_at;
        if rotation.client_ip.is_some() {
            record.client_ip = rotation.client_ip;
        }
        record.updated_at = Utc::now();
        Ok(Some(record.value().clone()))
    }

    async fn revoke(&self, id: i64, at: DateTime<Utc>) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self.records.get_mut(&id).map(|mut record| {
            if !record.is_revoked {
                record.is_revoked = true;
                record.revoked_at = Some(at);
            }
            record.updated_at = at;
            record.value().clone()
        }))
    }

    async fn revoke_all_for_user(&self, user_id: i64, at: DateTime<Utc>) -> Result<Vec<TokenRecord>, StoreError> {
        let mut revoked = Vec::new();
        for mut entry in self.records.iter_mut() {
            if entry.user_id == user_id && !entry.is_revoked {
                entry.is_revoked = true;
                entry.revoked_at = Some(at);
                entry.updated_at = at;
                revoked.push(entry.value().clone());
            }
        }
        Ok(revoked)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_fully_expired(now));
        Ok(before.saturating_sub(self.records.len()) as u64)
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<TokenStats, StoreError> {
        let mut stats = TokenStats::default();
        for entry in self.records.iter() {
            stats.total_tokens += 1;
            if entry.is_fully_expired(now) {
                stats.expired_tokens += 1;
            }
            if entry.is_revoked {
                stats.revoked_tokens += 1;
            }
        }
        Ok(stats)
    }
}
