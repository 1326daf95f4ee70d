pub mod auth_service;
pub mod cache_service;
pub mod cleanup_service;
pub mod menu_authorizer;
pub mod token_issuer;
pub mod token_store;
