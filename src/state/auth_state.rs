use crate::middleware::client_address::ClientAddressPolicy;
use crate::middleware::rate_limit::LoginRateLimiter;
use crate::service::auth_service::AuthService;

#[derive(Clone)]
pub struct AuthState {
    pub(crate) auth_service: AuthService,
    pub(crate) login_rate_limit: LoginRateLimiter,
    pub(crate) client_addresses: ClientAddressPolicy,
}

impl AuthState {
    pub fn new(
        auth_service: AuthService,
        login_rate_limit: LoginRateLimiter,
        client_addresses: ClientAddressPolicy,
    ) -> Self {
        Self {
            auth_service,
            login_rate_limit,
            client_addresses,
        }
    }
}
