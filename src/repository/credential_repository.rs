use crate::config::database::{Database, DatabaseTrait};
use crate::config::logging::secure_log;
use crate::entity::menu::Menu;
use crate::entity::role::Role;
use crate::entity::user::User;
use crate::error::store_error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const USER_COLUMNS: &str = "id, username, email, nickname, password, status, login_count, last_login_at, last_login_ip, is_deleted, created_at, updated_at";

/// Read/write access to users, roles and the menu relation.
///
/// The service never owns these records; it only reads identities and assignments
/// and stamps login metadata.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolve a login identifier against username OR email. Soft-deleted users are invisible.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError>;
    async fn find(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn record_login(&self, id: i64, client_ip: Option<&str>, at: DateTime<Utc>) -> Result<(), StoreError>;
    /// Active roles only
    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, StoreError>;
    async fn list_menus(&self) -> Result<Vec<Menu>, StoreError>;
    async fn menu_ids_for_roles(&self, role_ids: &[i64]) -> Result<Vec<i64>, StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgCredentialStore {
    db_conn: Arc<Database>,
}

impl PgCredentialStore {
    pub fn new(db_conn: &Arc<Database>) -> Self {
        Self {
            db_conn: Arc::clone(db_conn),
        }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let start = std::time::Instant::now();

        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE (username = $1 OR email = $1) AND is_deleted = FALSE ORDER BY id LIMIT 1"
        );
        match sqlx::query_as::<_, User>(&query)
            .bind(identifier)
            .fetch_optional(self.db_conn.get_pool())
            .await {
            Ok(user) => {
                secure_log::sensitive_debug!("User lookup by identifier completed in {:?}", start.elapsed());
                Ok(user)
            }
            Err(e) => {
                secure_log::secure_error!("User lookup by identifier failed", e);
                Err(e.into())
            }
        }
    }

    async fn find(&self, id: i64) -> Result<Option<User>, StoreError> {
        let start = std::time::Instant::now();

        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_deleted = FALSE");
        match sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(self.db_conn.get_pool())
            .await {
            Ok(user) => {
                secure_log::sensitive_debug!("User lookup by ID completed in {:?}", start.elapsed());
                Ok(user)
            }
            Err(e) => {
                secure_log::secure_error!("User lookup by ID failed", e);
                Err(e.into())
            }
        }
    }

    async fn record_login(&self, id: i64, client_ip: Option<&str>, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET login_count = login_count + 1, last_login_at = $2, last_login_ip = $3, updated_at = NOW() WHERE id = $1"
        )
        .bind(id)
        .bind(at)
        .bind(client_ip)
        .execute(self.db_conn.get_pool())
        .await
        .map(|_| ())
        .map_err(|e| {
            secure_log::secure_error!("Failed to record login metadata", e);
            e.into()
        })
    }

    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, StoreError> {
        sqlx::query_as::<_, Role>(
            "SELECT r.id, r.name, r.code, r.status, r.is_system_default FROM roles r \
             JOIN user_roles ur ON ur.role_id = r.id \
             WHERE ur.user_id = $1 AND r.status = 1 ORDER BY r.id"
        )
        .bind(user_id)
        .fetch_all(self.db_conn.get_pool())
        .await
        .map_err(|e| {
            secure_log::secure_error!("Role lookup for user failed", e);
            e.into()
        })
    }

    async fn list_menus(&self) -> Result<Vec<Menu>, StoreError> {
        let start = std::time::Instant::now();

        match sqlx::query_as::<_, Menu>(
            "SELECT id, name, menu_type, path, parent_id, status, sort_order, hide_in_menu, is_external_link, perm, icon \
             FROM menus WHERE is_deleted = FALSE"
        )
        .fetch_all(self.db_conn.get_pool())
        .await {
            Ok(menus) => {
                secure_log::sensitive_debug!("Loaded {} menus in {:?}", menus.len(), start.elapsed());
                Ok(menus)
            }
            Err(e) => {
                secure_log::secure_error!("Menu listing failed", e);
                Err(e.into())
            }
        }
    }

    async fn menu_ids_for_roles(&self, role_ids: &[i64]) -> Result<Vec<i64>, StoreError> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_scalar::<_, i64>("SELECT DISTINCT menu_id FROM role_menus WHERE role_id = ANY($1)")
            .bind(role_ids)
            .fetch_all(self.db_conn.get_pool())
            .await
            .map_err(|e| {
                secure_log::secure_error!("Role-menu assignment lookup failed", e);
                e.into()
            })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db_conn
            .get_pool()
            .acquire()
            .await
            .map(|_| ())
            .map_err(StoreError::from)
    }
}
