pub mod auth;
pub mod health;
pub mod menu;
pub mod root;
pub mod system;
