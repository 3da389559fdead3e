use crate::shared::error::AppError;
use async_trait::async_trait;

/// Durable keyed blob storage that survives process restarts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), AppError>;
    async fn delete(&self, key: &str) -> Result<bool, AppError>;
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, AppError>;
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, AppError>;
}
