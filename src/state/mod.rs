pub mod auth_state;
pub mod health_state;
pub mod menu_state;
pub mod system_state;
