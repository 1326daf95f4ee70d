use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::Persistence(error.to_string())
    }
}
