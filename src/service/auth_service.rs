use crate::config::logging::secure_log;
use crate::config::parameter;
use crate::dto::auth_dto::TokenPairDto;
use crate::dto::token_dto::{SignedTokenDto, TokenClaimsDto, TokenKind, TokenSubject};
use crate::dto::user_dto::UserProfileDto;
use crate::entity::token::NewTokenRecord;
use crate::entity::user::{User, UserStatus};
use crate::error::credential_error::CredentialError;
use crate::error::token_error::TokenError;
use crate::error::AppError;
use crate::repository::credential_repository::CredentialStore;
use crate::service::token_issuer::TokenIssuer;
use crate::service::token_store::{hash_token, InvalidReason, TokenStore, TokenValidity};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    /// Floor on password verification time, success or failure alike
    pub min_password_check: Duration,
}

impl AuthConfig {
    pub fn from_parameters() -> Self {
        Self {
            access_ttl_seconds: parameter::get_i64("ACCESS_TOKEN_TTL_SECONDS"),
            refresh_ttl_seconds: parameter::get_i64("REFRESH_TOKEN_TTL_SECONDS"),
            min_password_check: Duration::from_millis(parameter::get_u64("PASSWORD_VERIFY_MIN_MS")),
        }
    }
}

/// Where a request came from; stored on the token record
#[derive(Clone, Debug, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Principal attached to a request once its access token passed every check
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub claims: TokenClaimsDto,
    pub user: User,
    pub token_record_id: i64,
}

/// Session lifecycle: login, per-request validation, refresh rotation and logout.
#[derive(Clone)]
pub struct AuthService {
    issuer: TokenIssuer,
    tokens: TokenStore,
    credentials: Arc<dyn CredentialStore>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        issuer: TokenIssuer,
        tokens: TokenStore,
        credentials: Arc<dyn CredentialStore>,
        config: AuthConfig,
    ) -> Self {
        Self {
            issuer,
            tokens,
            credentials,
            config,
        }
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.tokens
    }

    pub async fn login(&self, identifier: &str, password: &str, client: ClientInfo) -> Result<TokenPairDto, AppError> {
        let user = self
            .credentials
            .find_by_identifier(identifier)
            .await?
            .ok_or_else(|| {
                warn!("SECURITY: Login failed - unknown identifier");
                secure_log::sensitive_debug!("Unknown login identifier: {}", identifier);
                CredentialError::UserNotFound
            })?;

        self.ensure_active(&user).await?;

        if !self.verify_password(&user, password).await {
            warn!("SECURITY: Login failed - invalid password for user ID: {}", user.id);
            return Err(CredentialError::InvalidPassword.into());
        }

        let (access, refresh) = self.issue_pair(&user)?;

        // Stamp first: a failure here must not leave a session row nobody received
        self.credentials
            .record_login(user.id, client.ip.as_deref(), Utc::now())
            .await?;

        self.tokens
            .create(NewTokenRecord {
                user_id: user.id,
                access_token_hash: hash_token(&access.token),
                refresh_token_hash: hash_token(&refresh.token),
                access_token_expires_at: expiry(&access)?,
                refresh_token_expires_at: expiry(&refresh)?,
                token_type: TOKEN_TYPE.to_string(),
                client_ip: client.ip.clone(),
                user_agent: client.user_agent,
            })
            .await?;

        info!("SECURITY: Login successful for user ID: {}", user.id);
        Ok(self.pair_response(access, refresh))
    }

    /// Store state first, then signature, then the owner's *current* status
    pub async fn validate(&self, access_token: &str) -> Result<AuthenticatedUser, AppError> {
        let record = match self.tokens.validate_access(access_token).await? {
            TokenValidity::Valid(record) => record,
            TokenValidity::Invalid(reason) => return Err(rejection(reason).into()),
        };

        let claims = self.issuer.verify(access_token)?;
        if claims.kind != TokenKind::Access {
            return Err(TokenError::WrongTokenType.into());
        }
        if claims.user_id != record.user_id {
            warn!("SECURITY: Token record owner mismatch for record {}", record.id);
            return Err(TokenError::InvalidToken.into());
        }

        let user = self.current_user(claims.user_id).await?;
        Ok(AuthenticatedUser {
            claims,
            user,
            token_record_id: record.id,
        })
    }

    pub async fn refresh(&self, refresh_token: &str, client: ClientInfo) -> Result<TokenPairDto, AppError> {
        // Type is checked before the store so an access token is reported as such
        let claims = self.issuer.verify(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            warn!("SECURITY: Non-refresh token presented for refresh by user ID: {}", claims.user_id);
            return Err(TokenError::WrongTokenType.into());
        }

        let record = match self.tokens.validate_refresh(refresh_token).await? {
            TokenValidity::Valid(record) => record,
            TokenValidity::Invalid(reason) => {
                warn!("SECURITY: Refresh rejected for user ID: {} ({:?})", claims.user_id, reason);
                return Err(rejection(reason).into());
            }
        };
        if claims.user_id != record.user_id {
            warn!("SECURITY: Refresh token owner mismatch for record {}", record.id);
            return Err(TokenError::InvalidToken.into());
        }

        let user = self.current_user(claims.user_id).await?;

        let (access, refresh) = self.issue_pair(&user)?;
        let rotated = self
            .tokens
            .rotate(
                refresh_token,
                &access.token,
                &refresh.token,
                (expiry(&access)?, expiry(&refresh)?),
                client.ip,
            )
            .await?;

        if rotated.is_none() {
            // Lost a race with another refresh of the same token, or a replay
            warn!("SECURITY: Refresh token replay detected for user ID: {}", user.id);
            return Err(TokenError::InvalidToken.into());
        }

        info!("SECURITY: Token pair refreshed for user ID: {}", user.id);
        Ok(self.pair_response(access, refresh))
    }

    /// Best-effort; never fails. With a token only that session is revoked, otherwise all of them.
    pub async fn logout(&self, user_id: i64, access_token: Option<&str>) {
        match access_token {
            Some(token) => match self.tokens.find_by_access_token(token).await {
                Ok(Some(record)) if record.user_id == user_id => {
                    if let Err(e) = self.tokens.revoke(record.id).await {
                        secure_log::secure_error!("SECURITY: Session revocation during logout failed", e);
                    }
                }
                Ok(_) => info!("SECURITY: Logout for user ID: {} found no matching session", user_id),
                Err(e) => secure_log::secure_error!("SECURITY: Session lookup during logout failed", e),
            },
            None => {
                if let Err(e) = self.tokens.revoke_all_for_user(user_id).await {
                    secure_log::secure_error!("SECURITY: Bulk revocation during logout failed", e);
                }
            }
        }
        info!("SECURITY: Logout completed for user ID: {}", user_id);
    }

    /// Logout keyed only by the presented access token. Revoked or expired tokens are accepted
    /// so that repeating a logout still succeeds.
    pub async fn logout_by_token(&self, access_token: &str, all_sessions: bool) {
        let owner = match self.tokens.find_by_access_token(access_token).await {
            Ok(record) => record.map(|record| record.user_id),
            Err(e) => {
                secure_log::secure_error!("SECURITY: Session lookup during logout failed", e);
                None
            }
        };

        match owner {
            Some(user_id) if all_sessions => self.logout(user_id, None).await,
            Some(user_id) => self.logout(user_id, Some(access_token)).await,
            None => info!("SECURITY: Logout presented a token with no stored session"),
        }
    }

    pub async fn profile(&self, user: User) -> Result<UserProfileDto, AppError> {
        let roles = self
            .credentials
            .roles_for_user(user.id)
            .await?
            .into_iter()
            .map(|role| role.code)
            .collect();
        Ok(UserProfileDto::from(user, roles))
    }

    pub async fn role_ids(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        Ok(self
            .credentials
            .roles_for_user(user_id)
            .await?
            .into_iter()
            .map(|role| role.id)
            .collect())
    }

    async fn current_user(&self, user_id: i64) -> Result<User, AppError> {
        let user = self
            .credentials
            .find(user_id)
            .await?
            .ok_or(CredentialError::UserNotFound)?;
        self.ensure_active(&user).await?;
        Ok(user)
    }

    /// Locked accounts additionally lose every open session
    async fn ensure_active(&self, user: &User) -> Result<(), CredentialError> {
        match user.status {
            UserStatus::Enabled => Ok(()),
            UserStatus::Disabled => {
                warn!("SECURITY: Rejected disabled account, user ID: {}", user.id);
                Err(CredentialError::AccountDisabled)
            }
            UserStatus::Locked => {
                warn!("SECURITY: Rejected locked account, user ID: {}", user.id);
                if let Err(e) = self.tokens.revoke_all_for_user(user.id).await {
                    secure_log::secure_error!("SECURITY: Revoking sessions of locked account failed", e);
                }
                Err(CredentialError::AccountLocked)
            }
        }
    }

    async fn verify_password(&self, user: &User, password: &str) -> bool {
        let started = Instant::now();

        let hash = user.password.clone();
        let candidate = password.to_string();
        // bcrypt compares in constant time; it is CPU-bound, so keep it off the reactor
        let result = tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &hash)).await;

        let elapsed = started.elapsed();
        if elapsed < self.config.min_password_check {
            tokio::time::sleep(self.config.min_password_check - elapsed).await;
        }

        match result {
            Ok(Ok(is_valid)) => is_valid,
            Ok(Err(e)) => {
                secure_log::secure_error!("SECURITY: Password verification system error", e);
                false
            }
            Err(e) => {
                secure_log::secure_error!("SECURITY: Password verification task failed", e);
                false
            }
        }
    }

    fn issue_pair(&self, user: &User) -> Result<(SignedTokenDto, SignedTokenDto), TokenError> {
        let subject = TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            status: user.status,
        };
        let access = self.issuer.issue(&subject, TokenKind::Access, self.config.access_ttl_seconds)?;
        let refresh = self.issuer.issue(&subject, TokenKind::Refresh, self.config.refresh_ttl_seconds)?;
        Ok((access, refresh))
    }

    fn pair_response(&self, access: SignedTokenDto, refresh: SignedTokenDto) -> TokenPairDto {
        TokenPairDto {
            access_token: access.token,
            refresh_token: refresh.token,
            access_token_expires_in: self.config.access_ttl_seconds,
            refresh_token_expires_in: self.config.refresh_ttl_seconds,
            token_type: TOKEN_TYPE.to_string(),
        }
    }
}

fn rejection(reason: InvalidReason) -> TokenError {
    match reason {
        InvalidReason::NotFound => TokenError::InvalidToken,
        InvalidReason::Revoked => TokenError::Revoked,
        InvalidReason::Expired => TokenError::Expired,
    }
}

fn expiry(token: &SignedTokenDto) -> Result<DateTime<Utc>, TokenError> {
    DateTime::<Utc>::from_timestamp(token.exp, 0)
        .ok_or_else(|| TokenError::TokenCreation("Token expiry out of range".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::menu::Menu;
    use crate::entity::role::Role;
    use crate::error::store_error::StoreError;
    use crate::repository::memory::{InMemoryCredentialStore, InMemoryTokenRepository};
    use crate::service::cache_service::InMemoryCache;
    use crate::service::token_issuer::tests::test_config;
    use crate::service::token_store::TokenStoreConfig;

    struct Fixture {
        service: AuthService,
        credentials: Arc<InMemoryCredentialStore>,
        repository: Arc<InMemoryTokenRepository>,
    }

    fn user(id: i64, username: &str, password: &str, status: UserStatus) -> User {
        let now = Utc::now();
        User {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            nickname: None,
            password: bcrypt::hash(password, 4).unwrap(),
            status,
            login_count: 0,
            last_login_at: None,
            last_login_ip: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn fixture() -> Fixture {
        let credentials = InMemoryCredentialStore::new_shared();
        credentials.insert_user(user(1, "admin", "admin123", UserStatus::Enabled));
        credentials.insert_role(Role {
            id: 1,
            name: "Super Admin".to_string(),
            code: "super_admin".to_string(),
            status: 1,
            is_system_default: true,
        });
        credentials.assign_role(1, 1);

        let repository = InMemoryTokenRepository::new_shared();
        let service = service_over(credentials.clone(), repository.clone());

        Fixture {
            service,
            credentials,
            repository,
        }
    }

    fn service_over(credentials: Arc<dyn CredentialStore>, repository: Arc<InMemoryTokenRepository>) -> AuthService {
        let tokens = TokenStore::new(
            repository,
            InMemoryCache::new_shared(),
            TokenStoreConfig::clamped(300, 7200, 604800),
        );
        AuthService::new(
            TokenIssuer::new(test_config()).unwrap(),
            tokens,
            credentials,
            AuthConfig {
                access_ttl_seconds: 7200,
                refresh_ttl_seconds: 604800,
                min_password_check: Duration::ZERO,
            },
        )
    }

    /// Delegates everything except the login stamp, which always fails
    struct StampFailingStore(Arc<InMemoryCredentialStore>);

    #[async_trait::async_trait]
    impl CredentialStore for StampFailingStore {
        async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
            self.0.find_by_identifier(identifier).await
        }
        async fn find(&self, id: i64) -> Result<Option<User>, StoreError> {
            self.0.find(id).await
        }
        async fn record_login(&self, _id: i64, _client_ip: Option<&str>, _at: DateTime<Utc>) -> Result<(), StoreError> {
            Err(StoreError::Persistence("connection reset".to_string()))
        }
        async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, StoreError> {
            self.0.roles_for_user(user_id).await
        }
        async fn list_menus(&self) -> Result<Vec<Menu>, StoreError> {
            self.0.list_menus().await
        }
        async fn menu_ids_for_roles(&self, role_ids: &[i64]) -> Result<Vec<i64>, StoreError> {
            self.0.menu_ids_for_roles(role_ids).await
        }
        async fn ping(&self) -> Result<(), StoreError> {
            self.0.ping().await
        }
    }

    fn client() -> ClientInfo {
        ClientInfo {
            ip: Some("10.1.2.3".to_string()),
            user_agent: Some("tests".to_string()),
        }
    }

    fn err_of<T: std::fmt::Debug>(result: Result<T, AppError>) -> String {
        result.unwrap_err().to_string()
    }

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let f = fixture();
        let pair = f.service.login("admin", "admin123", client()).await.unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.access_token_expires_in, 7200);
        assert_ne!(pair.access_token, pair.refresh_token);

        assert!(f.service.login("admin@example.com", "admin123", client()).await.is_ok());

        // Two logins, two concurrent sessions
        assert_eq!(f.repository.len(), 2);
        let user = f.credentials.find(1).await.unwrap().unwrap();
        assert_eq!(user.login_count, 2);
        assert_eq!(user.last_login_ip.as_deref(), Some("10.1.2.3"));
    }

    #[tokio::test]
    async fn test_login_failures() {
        let f = fixture();
        f.credentials.insert_user(user(2, "off", "pw", UserStatus::Disabled));
        f.credentials.insert_user(user(3, "held", "pw", UserStatus::Locked));

        assert!(matches!(
            f.service.login("ghost", "x", client()).await,
            Err(AppError::Credential(CredentialError::UserNotFound))
        ));
        assert!(matches!(
            f.service.login("admin", "wrong", client()).await,
            Err(AppError::Credential(CredentialError::InvalidPassword))
        ));
        assert!(matches!(
            f.service.login("off", "pw", client()).await,
            Err(AppError::Credential(CredentialError::AccountDisabled))
        ));
        assert!(matches!(
            f.service.login("held", "pw", client()).await,
            Err(AppError::Credential(CredentialError::AccountLocked))
        ));
        assert!(f.repository.is_empty());
    }

    #[tokio::test]
    async fn test_failed_login_stamp_leaves_no_session() {
        let f = fixture();
        let service = service_over(Arc::new(StampFailingStore(f.credentials.clone())), f.repository.clone());

        assert!(matches!(
            service.login("admin", "admin123", client()).await,
            Err(AppError::Store(_))
        ));
        assert!(f.repository.is_empty());
    }

    #[tokio::test]
    async fn test_validate_returns_principal() {
        let f = fixture();
        let pair = f.service.login("admin", "admin123", client()).await.unwrap();

        let principal = f.service.validate(&pair.access_token).await.unwrap();
        assert_eq!(principal.user.id, 1);
        assert_eq!(principal.claims.kind, TokenKind::Access);
    }

    #[tokio::test]
    async fn test_validate_rechecks_user_status() {
        let f = fixture();
        let pair = f.service.login("admin", "admin123", client()).await.unwrap();
        assert!(f.service.validate(&pair.access_token).await.is_ok());

        f.credentials.set_user_status(1, UserStatus::Disabled);
        assert!(matches!(
            f.service.validate(&pair.access_token).await,
            Err(AppError::Credential(CredentialError::AccountDisabled))
        ));
    }

    #[tokio::test]
    async fn test_locked_user_loses_sessions() {
        let f = fixture();
        let pair = f.service.login("admin", "admin123", client()).await.unwrap();

        f.credentials.set_user_status(1, UserStatus::Locked);
        assert!(matches!(
            f.service.validate(&pair.access_token).await,
            Err(AppError::Credential(CredentialError::AccountLocked))
        ));

        // Unlocking does not resurrect the revoked session
        f.credentials.set_user_status(1, UserStatus::Enabled);
        assert!(matches!(
            f.service.validate(&pair.access_token).await,
            Err(AppError::Token(TokenError::Revoked))
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_invalidates_predecessor() {
        let f = fixture();
        let first = f.service.login("admin", "admin123", client()).await.unwrap();

        let second = f.service.refresh(&first.refresh_token, client()).await.unwrap();
        assert_ne!(second.access_token, first.access_token);
        assert_ne!(second.refresh_token, first.refresh_token);
        assert_eq!(f.repository.len(), 1);

        assert!(matches!(
            f.service.refresh(&first.refresh_token, client()).await,
            Err(AppError::Token(TokenError::InvalidToken))
        ));
        // The old access token went with the overwritten row
        assert!(matches!(
            f.service.validate(&first.access_token).await,
            Err(AppError::Token(TokenError::InvalidToken))
        ));
        assert!(f.service.validate(&second.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let f = fixture();
        let pair = f.service.login("admin", "admin123", client()).await.unwrap();
        assert!(matches!(
            f.service.refresh(&pair.access_token, client()).await,
            Err(AppError::Token(TokenError::WrongTokenType))
        ));
    }

    #[tokio::test]
    async fn test_access_slot_rejects_refresh_token() {
        let f = fixture();
        let pair = f.service.login("admin", "admin123", client()).await.unwrap();
        assert!(f.service.validate(&pair.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_rechecks_user_status() {
        let f = fixture();
        let pair = f.service.login("admin", "admin123", client()).await.unwrap();
        f.credentials.set_user_status(1, UserStatus::Disabled);

        assert!(matches!(
            f.service.refresh(&pair.refresh_token, client()).await,
            Err(AppError::Credential(CredentialError::AccountDisabled))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_refresh_single_winner() {
        let f = fixture();
        let pair = f.service.login("admin", "admin123", client()).await.unwrap();

        let (a, b) = tokio::join!(
            f.service.refresh(&pair.refresh_token, client()),
            f.service.refresh(&pair.refresh_token, client()),
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let f = fixture();
        let pair = f.service.login("admin", "admin123", client()).await.unwrap();

        f.service.logout(1, Some(&pair.access_token)).await;
        f.service.logout(1, Some(&pair.access_token)).await;
        assert!(matches!(
            f.service.validate(&pair.access_token).await,
            Err(AppError::Token(TokenError::Revoked))
        ));
        assert!(matches!(
            f.service.refresh(&pair.refresh_token, client()).await,
            Err(AppError::Token(TokenError::Revoked))
        ));
    }

    #[tokio::test]
    async fn test_logout_without_token_ends_all_sessions() {
        let f = fixture();
        let one = f.service.login("admin", "admin123", client()).await.unwrap();
        let two = f.service.login("admin", "admin123", client()).await.unwrap();

        f.service.logout(1, None).await;
        assert!(f.service.validate(&one.access_token).await.is_err());
        assert!(f.service.validate(&two.access_token).await.is_err());
    }

    #[tokio::test]
    async fn test_logout_ignores_foreign_session() {
        let f = fixture();
        let pair = f.service.login("admin", "admin123", client()).await.unwrap();

        f.service.logout(99, Some(&pair.access_token)).await;
        assert!(f.service.validate(&pair.access_token).await.is_ok());
        assert!(err_of(f.service.validate("garbage").await).contains("Invalid token"));
    }

    #[tokio::test]
    async fn test_profile_lists_role_codes() {
        let f = fixture();
        let user = f.credentials.find(1).await.unwrap().unwrap();
        let profile = f.service.profile(user).await.unwrap();
        assert_eq!(profile.roles, vec!["super_admin".to_string()]);
        assert_eq!(f.service.role_ids(1).await.unwrap(), vec![1]);
    }
}
