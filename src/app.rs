use crate::config::database::{Database, DatabaseTrait};
use crate::config::parameter;
use crate::error::AppError;
use crate::middleware::client_address::ClientAddressPolicy;
use crate::middleware::rate_limit::LoginRateLimiter;
use crate::repository::credential_repository::{CredentialStore, PgCredentialStore};
use crate::repository::memory::{InMemoryCredentialStore, InMemoryTokenRepository};
use crate::repository::seed;
use crate::repository::token_repository::{PgTokenRepository, TokenRepository};
use crate::service::auth_service::{AuthConfig, AuthService};
use crate::service::cache_service::{Cache, InMemoryCache};
use crate::service::cleanup_service::CleanupService;
use crate::service::menu_authorizer::{MenuAuthorizer, MenuConfig};
use crate::service::token_issuer::{TokenIssuer, TokenIssuerConfig};
use crate::service::token_store::{TokenStore, TokenStoreConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Storage the services run against
#[derive(Clone)]
pub struct Backends {
    pub name: &'static str,
    pub credentials: Arc<dyn CredentialStore>,
    pub token_repository: Arc<dyn TokenRepository>,
    pub cache: Arc<dyn Cache>,
}

impl Backends {
    /// Chosen by `STORE_BACKEND`; the cache is always in-process
    pub async fn from_parameters() -> Result<Self, AppError> {
        match parameter::get("STORE_BACKEND").as_str() {
            "postgres" => {
                let db_conn = Arc::new(Database::init().await?);
                info!("Database connection established successfully");
                Ok(Self {
                    name: "postgres",
                    credentials: Arc::new(PgCredentialStore::new(&db_conn)),
                    token_repository: Arc::new(PgTokenRepository::new(&db_conn)),
                    cache: InMemoryCache::new_shared(),
                })
            }
            "memory" => {
                warn!("Using in-memory stores with demo accounts; state is lost on restart");
                let cost = parameter::get_u64("BCRYPT_COST") as u32;
                Self::in_memory_demo(cost)
            }
            other => Err(AppError::Config(format!("Unknown STORE_BACKEND: {other}"))),
        }
    }

    pub fn in_memory_demo(password_cost: u32) -> Result<Self, AppError> {
        let credentials = InMemoryCredentialStore::new_shared();
        seed::seed_demo_data(&credentials, password_cost)
            .map_err(|e| AppError::Internal(format!("Demo password hashing failed: {e}")))?;

        Ok(Self {
            name: "memory",
            credentials,
            token_repository: InMemoryTokenRepository::new_shared(),
            cache: InMemoryCache::new_shared(),
        })
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub issuer: TokenIssuerConfig,
    pub auth: AuthConfig,
    pub token_store: TokenStoreConfig,
    pub menu: MenuConfig,
    pub login_attempts_per_minute: usize,
    /// Honour `X-Forwarded-For` and friends; only behind a proxy that overwrites them
    pub trust_proxy_headers: bool,
    pub operator_key: Option<String>,
}

impl AppConfig {
    pub fn from_parameters() -> Self {
        let auth = AuthConfig::from_parameters();
        let token_store = TokenStoreConfig::from_parameters(auth.access_ttl_seconds, auth.refresh_ttl_seconds);
        Self {
            issuer: TokenIssuerConfig::from_parameters(),
            auth,
            token_store,
            menu: MenuConfig::from_parameters(),
            login_attempts_per_minute: parameter::get_u64("LOGIN_RATE_LIMIT_PER_MINUTE") as usize,
            trust_proxy_headers: parameter::get_bool("TRUST_PROXY_HEADERS"),
            operator_key: parameter::get_optional("CLEANUP_API_KEY"),
        }
    }
}

/// Every long-lived service, wired once at startup and cloned into router state
#[derive(Clone)]
pub struct AppContext {
    pub backend: &'static str,
    pub credentials: Arc<dyn CredentialStore>,
    pub tokens: TokenStore,
    pub auth_service: AuthService,
    pub menu_authorizer: MenuAuthorizer,
    pub cleanup_service: CleanupService,
    pub login_rate_limit: LoginRateLimiter,
    pub client_addresses: ClientAddressPolicy,
    pub operator_key: Option<String>,
}

impl AppContext {
    pub fn build(backends: Backends, config: AppConfig) -> Result<Self, AppError> {
        let issuer = TokenIssuer::new(config.issuer)?;
        let tokens = TokenStore::new(backends.token_repository, backends.cache.clone(), config.token_store);

        let auth_service = AuthService::new(issuer, tokens.clone(), backends.credentials.clone(), config.auth);
        let menu_authorizer = MenuAuthorizer::new(backends.credentials.clone(), backends.cache, config.menu);

        if config.operator_key.is_none() {
            warn!("CLEANUP_API_KEY is not set; operator endpoints will refuse every call");
        }

        Ok(Self {
            backend: backends.name,
            credentials: backends.credentials,
            cleanup_service: CleanupService::new(tokens.clone()),
            tokens,
            auth_service,
            menu_authorizer,
            login_rate_limit: LoginRateLimiter::new(config.login_attempts_per_minute, Duration::from_secs(60)),
            client_addresses: ClientAddressPolicy::new(config.trust_proxy_headers),
            operator_key: config.operator_key,
        })
    }
}
