use crate::service::cleanup_service::CleanupService;

#[derive(Clone)]
pub struct SystemState {
    pub(crate) cleanup_service: CleanupService,
    /// `None` disables every operator endpoint
    pub(crate) operator_key: Option<String>,
}

impl SystemState {
    pub fn new(cleanup_service: CleanupService, operator_key: Option<String>) -> Self {
        Self {
            cleanup_service,
            operator_key,
        }
    }
}
