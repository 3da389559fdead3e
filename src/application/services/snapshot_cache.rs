use crate::application::ports::clock::{Clock, SystemClock};
use crate::application::ports::key_value_store::KeyValueStore;
use crate::domain::entities::SnapshotEntry;
use crate::domain::value_objects::CacheKey;
use crate::shared::config::CacheConfig;
use crate::shared::error::AppError;
use chrono::Duration;
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const SNAPSHOT_KEY_PREFIX: &str = "offline_sync:snapshot:";

/// Time-bounded copy of the last known-good server state for read models.
///
/// Entries are persisted one blob per key and fronted by a small LRU. An entry
/// older than the TTL is never returned: reading it evicts it. The cache is
/// passive and never talks to the network.
pub struct SnapshotCache {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    memory: Mutex<LruCache<String, SnapshotEntry<Value>>>,
}

impl SnapshotCache {
    pub fn new(storage: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        storage: Arc<dyn KeyValueStore>,
        config: &CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        let ttl_secs = i64::try_from(config.ttl_secs).unwrap_or(i64::MAX);
        Self {
            storage,
            clock,
            ttl: Duration::try_seconds(ttl_secs).unwrap_or(Duration::MAX),
            memory: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Replaces the entry for `key` wholesale and stamps it with the current time.
    pub async fn put<T>(&self, key: &CacheKey, value: &T) -> Result<(), AppError>
    where
        T: Serialize,
    {
        let value = serde_json::to_value(value)
            .map_err(|err| AppError::SerializationError(format!("{key}: {err}")))?;
        let entry = SnapshotEntry::new(value, self.clock.now());
        let raw = serde_json::to_string(&entry)
            .map_err(|err| AppError::SerializationError(format!("{key}: {err}")))?;

        let mut memory = self.memory.lock().await;
        self.storage.put(&storage_key(key), &raw).await?;
        memory.put(key.to_string(), entry);

        debug!(cache_key = %key, "Stored snapshot");
        Ok(())
    }

    pub async fn get<T>(&self, key: &CacheKey) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned,
    {
        Ok(self.get_entry(key).await?.map(|entry| entry.value))
    }

    /// Like [`get`](Self::get) but keeps the capture time.
    pub async fn get_entry<T>(&self, key: &CacheKey) -> Result<Option<SnapshotEntry<T>>, AppError>
    where
        T: DeserializeOwned,
    {
        let mut memory = self.memory.lock().await;
        let Some(entry) = self.lookup(&mut memory, key).await? else {
            return Ok(None);
        };

        if !entry.is_valid_at(self.clock.now(), self.ttl) {
            self.evict(&mut memory, key).await?;
            debug!(cache_key = %key, "Evicted expired snapshot on read");
            return Ok(None);
        }

        let value = serde_json::from_value(entry.value)
            .map_err(|err| AppError::DeserializationError(format!("{key}: {err}")))?;
        Ok(Some(SnapshotEntry::new(value, entry.fetched_at)))
    }

    /// Evicts the entry for `key` if it has expired. Returns whether it was removed.
    pub async fn purge_expired(&self, key: &CacheKey) -> Result<bool, AppError> {
        let mut memory = self.memory.lock().await;
        let Some(entry) = self.lookup(&mut memory, key).await? else {
            return Ok(false);
        };

        if entry.is_valid_at(self.clock.now(), self.ttl) {
            return Ok(false);
        }
        self.evict(&mut memory, key).await?;
        Ok(true)
    }

    /// Sweeps every persisted snapshot and evicts the expired ones.
    pub async fn purge_all_expired(&self) -> Result<usize, AppError> {
        let mut memory = self.memory.lock().await;
        let keys = self.storage.keys_with_prefix(SNAPSHOT_KEY_PREFIX).await?;
        let now = self.clock.now();
        let mut purged = 0usize;

        for stored in keys {
            let Some(key) = CacheKey::from_scoped(SNAPSHOT_KEY_PREFIX, &stored) else {
                continue;
            };
            let expired = match self.lookup(&mut memory, &key).await? {
                Some(entry) => !entry.is_valid_at(now, self.ttl),
                None => false,
            };
            if expired {
                self.evict(&mut memory, &key).await?;
                purged += 1;
            }
        }

        if purged > 0 {
            debug!(purged, "Purged expired snapshots");
        }
        Ok(purged)
    }

    pub async fn clear_all(&self) -> Result<usize, AppError> {
        let mut memory = self.memory.lock().await;
        let removed = self.storage.delete_prefix(SNAPSHOT_KEY_PREFIX).await?;
        memory.clear();
        Ok(usize::try_from(removed).unwrap_or(usize::MAX))
    }

    async fn lookup(
        &self,
        memory: &mut LruCache<String, SnapshotEntry<Value>>,
        key: &CacheKey,
    ) -> Result<Option<SnapshotEntry<Value>>, AppError> {
        if let Some(entry) = memory.get(key.as_str()) {
            return Ok(Some(entry.clone()));
        }

        let Some(raw) = self.storage.get(&storage_key(key)).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<SnapshotEntry<Value>>(&raw) {
            Ok(entry) => {
                memory.put(key.to_string(), entry.clone());
                Ok(Some(entry))
            }
            Err(err) => {
                // a damaged copy is worth less than none
                warn!(cache_key = %key, error = %err, "Dropping unreadable snapshot");
                self.storage.delete(&storage_key(key)).await?;
                Ok(None)
            }
        }
    }

    async fn evict(
        &self,
        memory: &mut LruCache<String, SnapshotEntry<Value>>,
        key: &CacheKey,
    ) -> Result<(), AppError> {
        self.storage.delete(&storage_key(key)).await?;
        memory.pop(key.as_str());
        Ok(())
    }
}

fn storage_key(key: &CacheKey) -> String {
    key.scoped(SNAPSHOT_KEY_PREFIX)
}
