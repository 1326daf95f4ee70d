pub mod menu;
pub mod role;
pub mod token;
pub mod user;
