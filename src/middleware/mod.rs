pub mod auth;
pub mod client_address;
pub mod operator_key;
pub mod rate_limit;
