use crate::application::ports::key_value_store::KeyValueStore;
use crate::application::services::{
    ConsumerRegistry, MutationDispatcher, MutationQueue, SnapshotCache, SyncCoordinator,
};
use crate::infrastructure::connectivity::ConnectivityObserver;
use crate::infrastructure::jobs::SyncJob;
use crate::infrastructure::storage::{ConnectionPool, SqliteKeyValueStore};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use tracing::info;

/// Every offline component wired against one storage backend.
#[derive(Clone)]
pub struct OfflineSyncState {
    pub queue: Arc<MutationQueue>,
    pub snapshot_cache: Arc<SnapshotCache>,
    pub registry: Arc<ConsumerRegistry>,
    pub coordinator: Arc<SyncCoordinator>,
    pub connectivity: Arc<ConnectivityObserver>,
    pub dispatcher: Arc<MutationDispatcher>,
    pub sync_job: Arc<SyncJob>,
}

impl OfflineSyncState {
    /// Opens the configured SQLite database, runs migrations and wires the components.
    pub async fn initialize(config: &AppConfig) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;
        let pool = ConnectionPool::new(&config.database).await?;
        pool.migrate().await?;
        info!(url = %config.database.url, "Offline storage ready");

        let storage = Arc::new(SqliteKeyValueStore::new(pool.get_pool().clone()));
        Ok(Self::with_storage(storage, config))
    }

    pub fn with_storage(storage: Arc<dyn KeyValueStore>, config: &AppConfig) -> Self {
        let queue = Arc::new(MutationQueue::new(Arc::clone(&storage)));
        let snapshot_cache = Arc::new(SnapshotCache::new(storage, &config.cache));
        let registry = Arc::new(ConsumerRegistry::new());
        let coordinator = Arc::new(SyncCoordinator::new(
            Arc::clone(&queue),
            Arc::clone(&registry),
            config.sync.clone(),
        ));
        let connectivity = Arc::new(ConnectivityObserver::default());
        let dispatcher = Arc::new(MutationDispatcher::new(
            Arc::clone(&queue),
            Arc::clone(&registry),
            Arc::clone(&connectivity),
        ));
        let sync_job = SyncJob::create(Arc::clone(&coordinator));

        Self {
            queue,
            snapshot_cache,
            registry,
            coordinator,
            connectivity,
            dispatcher,
            sync_job,
        }
    }
}
