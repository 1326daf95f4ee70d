pub mod auth_handler;
pub mod health_handler;
pub mod menu_handler;
pub mod system_handler;
