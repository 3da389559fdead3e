use crate::application::ports::clock::{Clock, SystemClock};
use crate::application::services::consumer_registry::ConsumerRegistry;
use crate::application::services::mutation_queue::MutationQueue;
use crate::domain::entities::MutationRecord;
use crate::domain::value_objects::{MutationId, MutationKind, MutationPayload};
use crate::infrastructure::connectivity::ConnectivityObserver;
use crate::shared::error::AppError;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The consumer accepted the mutation right away.
    Applied,
    /// The remote was unreachable; the mutation waits in the queue.
    Queued(MutationId),
}

/// Entry point for producers that should not care whether they are online.
pub struct MutationDispatcher {
    queue: Arc<MutationQueue>,
    registry: Arc<ConsumerRegistry>,
    connectivity: Arc<ConnectivityObserver>,
    clock: Arc<dyn Clock>,
}

impl MutationDispatcher {
    pub fn new(
        queue: Arc<MutationQueue>,
        registry: Arc<ConsumerRegistry>,
        connectivity: Arc<ConnectivityObserver>,
    ) -> Self {
        Self::with_clock(queue, registry, connectivity, Arc::new(SystemClock))
    }

    pub fn with_clock(
        queue: Arc<MutationQueue>,
        registry: Arc<ConsumerRegistry>,
        connectivity: Arc<ConnectivityObserver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            queue,
            registry,
            connectivity,
            clock,
        }
    }

    /// Applies the mutation live when the remote is reachable, otherwise queues it.
    ///
    /// A live failure is returned to the caller and nothing is queued.
    pub async fn submit(
        &self,
        kind: MutationKind,
        payload: MutationPayload,
    ) -> Result<SubmitOutcome, AppError> {
        if !self.connectivity.is_reachable() {
            let id = self.queue.enqueue(kind, payload).await?;
            return Ok(SubmitOutcome::Queued(id));
        }

        let Some(consumer) = self.registry.get(&kind).await else {
            return Err(AppError::UnregisteredConsumer(kind.to_string()));
        };
        let record = MutationRecord::new(kind, payload, self.clock.now());
        consumer.apply(&record).await?;
        debug!(mutation_id = %record.id, kind = %record.kind, "Applied mutation live");
        Ok(SubmitOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::clock::ManualClock;
    use crate::application::ports::mutation_consumer::FnConsumer;
    use crate::infrastructure::storage::MemoryKeyValueStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn setup(reachable: bool, fail: bool) -> (MutationDispatcher, Arc<AtomicUsize>) {
        let queue = Arc::new(MutationQueue::new(Arc::new(MemoryKeyValueStore::new())));
        let registry = Arc::new(ConsumerRegistry::new());
        let applied = Arc::new(AtomicUsize::new(0));
        let counter = applied.clone();
        registry
            .register(
                MutationKind::create(),
                Arc::new(FnConsumer::new(move |_record| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if fail {
                            Err(AppError::ApplyFailed("table already closed".to_string()))
                        } else {
                            Ok(())
                        }
                    }
                })),
            )
            .await
            .unwrap();
        let dispatcher = MutationDispatcher::new(
            queue,
            registry,
            Arc::new(ConnectivityObserver::new(reachable)),
        );
        (dispatcher, applied)
    }

    fn order() -> MutationPayload {
        MutationPayload::new(json!({ "table": 3, "items": ["ramen"] })).unwrap()
    }

    #[tokio::test]
    async fn online_submit_applies_live() {
        let (dispatcher, applied) = setup(true, false).await;

        let outcome = dispatcher.submit(MutationKind::create(), order()).await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Applied);
        assert_eq!(applied.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.queue.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn offline_submit_queues_without_applying() {
        let (dispatcher, applied) = setup(false, false).await;

        let outcome = dispatcher.submit(MutationKind::create(), order()).await.unwrap();

        let SubmitOutcome::Queued(id) = outcome else {
            panic!("expected the mutation to be queued");
        };
        assert_eq!(applied.load(Ordering::SeqCst), 0);
        let pending = dispatcher.queue.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].attempts, 0);
    }

    #[tokio::test]
    async fn online_failure_is_returned_not_queued() {
        let (dispatcher, _) = setup(true, true).await;

        let err = dispatcher
            .submit(MutationKind::create(), order())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ApplyFailed(_)));
        assert_eq!(dispatcher.queue.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn online_submit_for_unknown_kind_fails() {
        let (dispatcher, _) = setup(true, false).await;

        let err = dispatcher
            .submit(MutationKind::update(), order())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnregisteredConsumer(kind) if kind == "update"));
    }

    #[tokio::test]
    async fn live_record_is_stamped_by_injected_clock() {
        let at = chrono::DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let clock = Arc::new(ManualClock::new(at));
        let registry = Arc::new(ConsumerRegistry::new());
        let stamps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = stamps.clone();
        registry
            .register(
                MutationKind::create(),
                Arc::new(FnConsumer::new(move |record: MutationRecord| {
                    sink.lock().unwrap().push(record.enqueued_at);
                    async { Ok::<(), AppError>(()) }
                })),
            )
            .await
            .unwrap();
        let dispatcher = MutationDispatcher::with_clock(
            Arc::new(MutationQueue::new(Arc::new(MemoryKeyValueStore::new()))),
            registry,
            Arc::new(ConnectivityObserver::new(true)),
            clock,
        );

        dispatcher.submit(MutationKind::create(), order()).await.unwrap();

        assert_eq!(stamps.lock().unwrap().as_slice(), &[at]);
    }
}
