pub mod credential_repository;
pub mod memory;
pub mod seed;
pub mod token_repository;
