use crate::config::parameter;
use async_trait::async_trait;
use sqlx::{Error, Pool, Postgres, pool::PoolOptions};
use tracing::info;

pub struct Database {
    pool: Pool<Postgres>,
}

#[async_trait]
pub trait DatabaseTrait {
    async fn init() -> Result<Self, Error>
        where
            Self: Sized;
    fn get_pool(&self) -> &Pool<Postgres>;
}

#[async_trait]
impl DatabaseTrait for Database {
    async fn init() -> Result<Self, Error> {
        let database_url = parameter::get("DATABASE_URL");

        let max_connections = parameter::get_u64("DB_MAX_CONNECTIONS") as u32;
        let min_connections = parameter::get_u64("DB_MIN_CONNECTIONS") as u32;
        let acquire_timeout_seconds = parameter::get_u64("DB_ACQUIRE_TIMEOUT_SECONDS");

        let pool = PoolOptions::<Postgres>::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(std::time::Duration::from_secs(acquire_timeout_seconds))
            .idle_timeout(std::time::Duration::from_secs(600))
            .max_lifetime(std::time::Duration::from_secs(1800))
            .connect(&database_url)
            .await?;

        // Pool sizing is only worth printing outside production
        let is_development = cfg!(debug_assertions) ||
            parameter::get_optional("ENV")
                .map(|env| env == "development")
                .unwrap_or(false);
        if is_development {
            info!(
                "Database pool configured: max={}, min={}, acquire_timeout={}s",
                max_connections, min_connections, acquire_timeout_seconds
            );
        } else {
            info!("Database pool configured successfully");
        }

        Ok(Self { pool })
    }

    fn get_pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}
