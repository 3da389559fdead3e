use crate::application::ports::clock::{Clock, SystemClock};
use crate::application::ports::key_value_store::KeyValueStore;
use crate::domain::entities::{DeadLetterRecord, MutationRecord};
use crate::domain::value_objects::{MutationId, MutationKind, MutationPayload};
use crate::shared::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

pub const QUEUE_STORAGE_KEY: &str = "offline_sync:mutation_queue";
pub const DEAD_LETTER_STORAGE_KEY: &str = "offline_sync:dead_letters";

#[derive(Default)]
struct QueueState {
    pending: Vec<MutationRecord>,
    dead_letters: Vec<DeadLetterRecord>,
}

/// Durable, ordered store of pending mutations.
///
/// Every mutating call rewrites the whole record set under one storage key
/// before returning, and all calls are serialized by a single lock so an
/// `enqueue` can never race a `remove` or `increment_attempts`. The in-memory
/// copy is loaded on first use and only updated after storage accepted the
/// write.
pub struct MutationQueue {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<Option<QueueState>>,
}

impl MutationQueue {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            state: Mutex::new(None),
        }
    }

    pub async fn enqueue(
        &self,
        kind: MutationKind,
        payload: MutationPayload,
    ) -> Result<MutationId, AppError> {
        let mut state = self.state().await?;
        let record = MutationRecord::new(kind, payload, self.clock.now());
        let id = record.id.clone();

        let mut next = state.pending.clone();
        next.push(record);
        self.write_blob(QUEUE_STORAGE_KEY, &next).await?;
        state.pending = next;

        debug!(mutation_id = %id, pending = state.pending.len(), "Enqueued mutation");
        Ok(id)
    }

    /// Pending records in enqueue order.
    pub async fn list_pending(&self) -> Result<Vec<MutationRecord>, AppError> {
        Ok(self.state().await?.pending.clone())
    }

    pub async fn pending_count(&self) -> Result<usize, AppError> {
        Ok(self.state().await?.pending.len())
    }

    pub async fn remove(&self, id: &MutationId) -> Result<bool, AppError> {
        let mut state = self.state().await?;
        if !state.pending.iter().any(|record| &record.id == id) {
            return Ok(false);
        }

        let next: Vec<MutationRecord> = state
            .pending
            .iter()
            .filter(|record| &record.id != id)
            .cloned()
            .collect();
        self.write_blob(QUEUE_STORAGE_KEY, &next).await?;
        state.pending = next;

        debug!(mutation_id = %id, "Removed mutation");
        Ok(true)
    }

    /// Records one more failed apply attempt and returns the new count.
    pub async fn increment_attempts(&self, id: &MutationId) -> Result<u32, AppError> {
        let mut state = self.state().await?;
        let mut next = state.pending.clone();
        let record = next
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Pending mutation {id}")))?;
        let attempts = record.record_failed_attempt();

        self.write_blob(QUEUE_STORAGE_KEY, &next).await?;
        state.pending = next;

        Ok(attempts)
    }

    pub async fn clear(&self) -> Result<(), AppError> {
        let mut state = self.state().await?;
        let empty: Vec<MutationRecord> = Vec::new();
        self.write_blob(QUEUE_STORAGE_KEY, &empty).await?;
        let cleared = std::mem::take(&mut state.pending).len();

        info!(cleared, "Cleared mutation queue");
        Ok(())
    }

    /// Moves a pending record into the dead-letter list.
    ///
    /// The dead-letter list is written first, so an interrupted move leaves the
    /// record in both lists rather than in neither; loading resolves that in
    /// favour of the dead-letter copy. If the pending list cannot be rewritten
    /// the dead-letter blob is restored and memory is left untouched.
    pub async fn dead_letter(
        &self,
        id: &MutationId,
        last_error: Option<String>,
    ) -> Result<Option<DeadLetterRecord>, AppError> {
        let mut state = self.state().await?;
        let Some(record) = state.pending.iter().find(|record| &record.id == id).cloned() else {
            return Ok(None);
        };

        let dead = DeadLetterRecord::new(record, self.clock.now(), last_error);
        let mut dead_letters = state.dead_letters.clone();
        if !dead_letters.iter().any(|existing| &existing.record.id == id) {
            dead_letters.push(dead.clone());
        }
        let pending: Vec<MutationRecord> = state
            .pending
            .iter()
            .filter(|record| &record.id != id)
            .cloned()
            .collect();

        self.write_blob(DEAD_LETTER_STORAGE_KEY, &dead_letters).await?;
        if let Err(err) = self.write_blob(QUEUE_STORAGE_KEY, &pending).await {
            self.restore_blob(DEAD_LETTER_STORAGE_KEY, &state.dead_letters).await;
            return Err(err);
        }
        state.dead_letters = dead_letters;
        state.pending = pending;

        warn!(
            mutation_id = %id,
            kind = %dead.record.kind,
            attempts = dead.record.attempts,
            "Mutation moved to dead letters"
        );
        Ok(Some(dead))
    }

    pub async fn list_dead_letters(&self) -> Result<Vec<DeadLetterRecord>, AppError> {
        Ok(self.state().await?.dead_letters.clone())
    }

    pub async fn dead_letter_count(&self) -> Result<usize, AppError> {
        Ok(self.state().await?.dead_letters.len())
    }

    /// Puts a dead-lettered record back at the tail of the pending queue with a
    /// fresh retry budget. The id is kept so consumers can recognise replays.
    pub async fn requeue_dead_letter(&self, id: &MutationId) -> Result<MutationRecord, AppError> {
        let mut state = self.state().await?;
        let dead = state
            .dead_letters
            .iter()
            .find(|dead| &dead.record.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Dead-lettered mutation {id}")))?;

        let mut record = dead.record;
        record.attempts = 0;

        let mut pending = state.pending.clone();
        if !pending.iter().any(|existing| &existing.id == id) {
            pending.push(record.clone());
        }
        let dead_letters: Vec<DeadLetterRecord> = state
            .dead_letters
            .iter()
            .filter(|dead| &dead.record.id != id)
            .cloned()
            .collect();

        self.write_blob(QUEUE_STORAGE_KEY, &pending).await?;
        if let Err(err) = self.write_blob(DEAD_LETTER_STORAGE_KEY, &dead_letters).await {
            self.restore_blob(QUEUE_STORAGE_KEY, &state.pending).await;
            return Err(err);
        }
        state.pending = pending;
        state.dead_letters = dead_letters;

        info!(mutation_id = %id, "Requeued dead-lettered mutation");
        Ok(record)
    }

    pub async fn discard_dead_letter(&self, id: &MutationId) -> Result<bool, AppError> {
        let mut state = self.state().await?;
        if !state.dead_letters.iter().any(|dead| &dead.record.id == id) {
            return Ok(false);
        }

        let dead_letters: Vec<DeadLetterRecord> = state
            .dead_letters
            .iter()
            .filter(|dead| &dead.record.id != id)
            .cloned()
            .collect();
        self.write_blob(DEAD_LETTER_STORAGE_KEY, &dead_letters).await?;
        state.dead_letters = dead_letters;

        info!(mutation_id = %id, "Discarded dead-lettered mutation");
        Ok(true)
    }

    pub async fn clear_dead_letters(&self) -> Result<usize, AppError> {
        let mut state = self.state().await?;
        let empty: Vec<DeadLetterRecord> = Vec::new();
        self.write_blob(DEAD_LETTER_STORAGE_KEY, &empty).await?;
        Ok(std::mem::take(&mut state.dead_letters).len())
    }

    async fn state(&self) -> Result<MappedMutexGuard<'_, QueueState>, AppError> {
        let mut guard = self.state.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        Ok(MutexGuard::map(guard, |state| {
            state.get_or_insert_with(QueueState::default)
        }))
    }

    async fn load(&self) -> Result<QueueState, AppError> {
        let mut pending: Vec<MutationRecord> = self.read_blob(QUEUE_STORAGE_KEY).await?;
        let dead_letters: Vec<DeadLetterRecord> = self.read_blob(DEAD_LETTER_STORAGE_KEY).await?;

        let dead_ids: HashSet<&MutationId> =
            dead_letters.iter().map(|dead| &dead.record.id).collect();
        let before = pending.len();
        pending.retain(|record| !dead_ids.contains(&record.id));
        if pending.len() != before {
            warn!(
                duplicates = before - pending.len(),
                "Dropped pending copies of dead-lettered mutations"
            );
        }

        debug!(
            pending = pending.len(),
            dead_letters = dead_letters.len(),
            "Loaded mutation queue from storage"
        );
        Ok(QueueState {
            pending,
            dead_letters,
        })
    }

    async fn read_blob<T>(&self, key: &str) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned,
    {
        let Some(raw) = self.storage.get(key).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|err| {
            error!(key, error = %err, "Stored mutation blob is unreadable");
            AppError::DeserializationError(format!("{key}: {err}"))
        })
    }

    /// Rewrites `key` with the records memory still holds after a two-blob
    /// update failed halfway.
    async fn restore_blob<T>(&self, key: &str, records: &[T])
    where
        T: Serialize,
    {
        if let Err(err) = self.write_blob(key, records).await {
            warn!(key, error = %err, "Could not roll back mutation blob");
        }
    }

    async fn write_blob<T>(&self, key: &str, records: &[T]) -> Result<(), AppError>
    where
        T: Serialize,
    {
        let raw = serde_json::to_string(records)
            .map_err(|err| AppError::SerializationError(format!("{key}: {err}")))?;
        self.storage.put(key, &raw).await.map_err(|err| {
            error!(key, error = %err, "Failed to persist mutation blob");
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::MemoryKeyValueStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    struct FlakyStore {
        inner: MemoryKeyValueStore,
        fail_writes: AtomicBool,
        failing_key: StdMutex<Option<&'static str>>,
    }

    impl FlakyStore {
        fn new(fail_writes: bool) -> Self {
            Self {
                inner: MemoryKeyValueStore::new(),
                fail_writes: AtomicBool::new(fail_writes),
                failing_key: StdMutex::new(None),
            }
        }

        fn fail_key(&self, key: Option<&'static str>) {
            *self.failing_key.lock().unwrap() = key;
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
            let key_fails = *self.failing_key.lock().unwrap() == Some(key);
            if key_fails || self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::Storage("disk full".to_string()));
            }
            self.inner.put(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<bool, AppError> {
            self.inner.delete(key).await
        }

        async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, AppError> {
            self.inner.keys_with_prefix(prefix).await
        }

        async fn delete_prefix(&self, prefix: &str) -> Result<u64, AppError> {
            self.inner.delete_prefix(prefix).await
        }
    }

    fn payload(value: serde_json::Value) -> MutationPayload {
        MutationPayload::new(value).unwrap()
    }

    #[tokio::test]
    async fn enqueue_survives_restart_in_order() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let queue = MutationQueue::new(storage.clone());

        let mut ids = Vec::new();
        for i in 0..4 {
            ids.push(
                queue
                    .enqueue(MutationKind::create(), payload(json!({"index": i})))
                    .await
                    .unwrap(),
            );
        }
        drop(queue);

        let restarted = MutationQueue::new(storage);
        let pending = restarted.list_pending().await.unwrap();

        assert_eq!(
            pending.iter().map(|r| r.id.clone()).collect::<Vec<_>>(),
            ids
        );
        assert!(pending.iter().all(|record| record.attempts == 0));
        assert_eq!(pending[2].payload.as_json(), &json!({"index": 2}));
    }

    #[tokio::test]
    async fn enqueue_surfaces_persistence_failure() {
        let storage = Arc::new(FlakyStore::new(true));
        let queue = MutationQueue::new(storage.clone());

        let err = queue
            .enqueue(MutationKind::create(), payload(json!({"table": "T1"})))
            .await
            .unwrap_err();

        assert!(err.is_persistence_failure());
        assert_eq!(queue.pending_count().await.unwrap(), 0);

        storage.fail_writes.store(false, Ordering::SeqCst);
        queue
            .enqueue(MutationKind::create(), payload(json!({"table": "T2"})))
            .await
            .unwrap();
        assert_eq!(queue.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn increment_attempts_persists_and_rejects_unknown_ids() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let queue = MutationQueue::new(storage.clone());
        let id = queue
            .enqueue(MutationKind::update(), payload(json!({"status": "ready"})))
            .await
            .unwrap();

        assert_eq!(queue.increment_attempts(&id).await.unwrap(), 1);
        assert_eq!(queue.increment_attempts(&id).await.unwrap(), 2);

        let restarted = MutationQueue::new(storage);
        assert_eq!(restarted.list_pending().await.unwrap()[0].attempts, 2);

        let missing = MutationId::generate();
        assert!(matches!(
            restarted.increment_attempts(&missing).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let queue = MutationQueue::new(Arc::new(MemoryKeyValueStore::new()));
        let first = queue
            .enqueue(MutationKind::create(), payload(json!({"n": 1})))
            .await
            .unwrap();
        queue
            .enqueue(MutationKind::create(), payload(json!({"n": 2})))
            .await
            .unwrap();

        assert!(queue.remove(&first).await.unwrap());
        assert!(!queue.remove(&first).await.unwrap());
        assert_eq!(queue.pending_count().await.unwrap(), 1);

        queue.clear().await.unwrap();
        assert_eq!(queue.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn corrupt_blob_is_reported_not_discarded() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        storage.put(QUEUE_STORAGE_KEY, "{not json").await.unwrap();

        let queue = MutationQueue::new(storage.clone());
        let err = queue.list_pending().await.unwrap_err();
        assert!(matches!(err, AppError::DeserializationError(_)));
        assert_eq!(
            storage.get(QUEUE_STORAGE_KEY).await.unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[tokio::test]
    async fn dead_letter_round_trip() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let queue = MutationQueue::new(storage.clone());
        let id = queue
            .enqueue(MutationKind::create(), payload(json!({"table": "T9"})))
            .await
            .unwrap();
        queue.increment_attempts(&id).await.unwrap();

        let dead = queue
            .dead_letter(&id, Some("remote rejected".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dead.record.attempts, 1);
        assert_eq!(queue.pending_count().await.unwrap(), 0);

        let restarted = MutationQueue::new(storage);
        let dead_letters = restarted.list_dead_letters().await.unwrap();
        assert_eq!(dead_letters.len(), 1);
        assert_eq!(dead_letters[0].last_error.as_deref(), Some("remote rejected"));

        let requeued = restarted.requeue_dead_letter(&id).await.unwrap();
        assert_eq!(requeued.id, id);
        assert_eq!(requeued.attempts, 0);
        assert_eq!(restarted.pending_count().await.unwrap(), 1);
        assert_eq!(restarted.dead_letter_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn discard_and_clear_dead_letters() {
        let queue = MutationQueue::new(Arc::new(MemoryKeyValueStore::new()));
        let a = queue
            .enqueue(MutationKind::create(), payload(json!({"n": 1})))
            .await
            .unwrap();
        let b = queue
            .enqueue(MutationKind::create(), payload(json!({"n": 2})))
            .await
            .unwrap();
        queue.dead_letter(&a, None).await.unwrap();
        queue.dead_letter(&b, None).await.unwrap();

        assert!(queue.discard_dead_letter(&a).await.unwrap());
        assert!(!queue.discard_dead_letter(&a).await.unwrap());
        assert_eq!(queue.clear_dead_letters().await.unwrap(), 1);
        assert!(matches!(
            queue.requeue_dead_letter(&b).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn interrupted_dead_letter_move_prefers_dead_letter_copy() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let queue = MutationQueue::new(storage.clone());
        let id = queue
            .enqueue(MutationKind::create(), payload(json!({"n": 1})))
            .await
            .unwrap();
        let record = queue.list_pending().await.unwrap().remove(0);

        // dead-letter blob written, pending blob not yet rewritten
        let dead = vec![DeadLetterRecord::new(record, chrono::Utc::now(), None)];
        storage
            .put(DEAD_LETTER_STORAGE_KEY, &serde_json::to_string(&dead).unwrap())
            .await
            .unwrap();

        let restarted = MutationQueue::new(storage);
        assert_eq!(restarted.pending_count().await.unwrap(), 0);
        assert_eq!(restarted.list_dead_letters().await.unwrap()[0].record.id, id);
    }

    #[tokio::test]
    async fn failed_dead_letter_move_keeps_record_pending_only() {
        let storage = Arc::new(FlakyStore::new(false));
        let queue = MutationQueue::new(storage.clone());
        let id = queue
            .enqueue(MutationKind::update(), payload(json!({"table": "T4"})))
            .await
            .unwrap();

        storage.fail_key(Some(QUEUE_STORAGE_KEY));
        let err = queue
            .dead_letter(&id, Some("remote rejected".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_persistence_failure());
        assert_eq!(queue.pending_count().await.unwrap(), 1);
        assert_eq!(queue.dead_letter_count().await.unwrap(), 0);

        let restarted = MutationQueue::new(storage.clone());
        assert_eq!(restarted.pending_count().await.unwrap(), 1);
        assert_eq!(restarted.dead_letter_count().await.unwrap(), 0);

        storage.fail_key(None);
        queue.dead_letter(&id, None).await.unwrap().unwrap();
        let dead_letters = queue.list_dead_letters().await.unwrap();
        assert_eq!(
            dead_letters
                .iter()
                .filter(|dead| dead.record.id == id)
                .count(),
            1
        );
        assert_eq!(queue.pending_count().await.unwrap(), 0);
        assert!(queue.dead_letter(&id, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_requeue_keeps_record_dead_lettered_only() {
        let storage = Arc::new(FlakyStore::new(false));
        let queue = MutationQueue::new(storage.clone());
        let id = queue
            .enqueue(MutationKind::create(), payload(json!({"n": 1})))
            .await
            .unwrap();
        queue.dead_letter(&id, None).await.unwrap();

        storage.fail_key(Some(DEAD_LETTER_STORAGE_KEY));
        assert!(queue.requeue_dead_letter(&id).await.is_err());
        assert_eq!(queue.pending_count().await.unwrap(), 0);
        assert_eq!(queue.dead_letter_count().await.unwrap(), 1);

        let restarted = MutationQueue::new(storage.clone());
        assert_eq!(restarted.pending_count().await.unwrap(), 0);
        assert_eq!(restarted.dead_letter_count().await.unwrap(), 1);

        storage.fail_key(None);
        queue.requeue_dead_letter(&id).await.unwrap();
        assert_eq!(queue.pending_count().await.unwrap(), 1);
        assert_eq!(queue.dead_letter_count().await.unwrap(), 0);
    }
}
