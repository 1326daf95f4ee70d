use crate::repository::credential_repository::CredentialStore;
use crate::service::token_store::TokenStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct HealthState {
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) tokens: TokenStore,
    pub(crate) backend: &'static str,
}

impl HealthState {
    pub fn new(credentials: Arc<dyn CredentialStore>, tokens: TokenStore, backend: &'static str) -> Self {
        Self {
            credentials,
            tokens,
            backend,
        }
    }
}
