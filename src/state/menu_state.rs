use crate::service::auth_service::AuthService;
use crate::service::menu_authorizer::MenuAuthorizer;

#[derive(Clone)]
pub struct MenuState {
    pub(crate) auth_service: AuthService,
    pub(crate) menu_authorizer: MenuAuthorizer,
}

impl MenuState {
    pub fn new(auth_service: AuthService, menu_authorizer: MenuAuthorizer) -> Self {
        Self {
            auth_service,
            menu_authorizer,
        }
    }
}
