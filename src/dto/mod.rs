pub mod auth_dto;
pub mod menu_dto;
pub mod system_dto;
pub mod token_dto;
pub mod user_dto;
