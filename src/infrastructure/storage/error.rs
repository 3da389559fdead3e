use crate::shared::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid database url: {0}")]
    InvalidUrl(String),

    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidUrl(msg) => AppError::ConfigurationError(msg),
            StorageError::Io(err) => AppError::Storage(err.to_string()),
            StorageError::Sqlx(err) => AppError::Database(err.to_string()),
            StorageError::Migrate(err) => AppError::Database(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
