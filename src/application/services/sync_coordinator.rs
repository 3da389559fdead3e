use crate::application::services::consumer_registry::ConsumerRegistry;
use crate::application::services::mutation_queue::MutationQueue;
use crate::domain::entities::{MutationRecord, SyncOutcome};
use crate::infrastructure::offline::{SyncMetrics, SyncMetricsSnapshot};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// Drains the mutation queue against the registered consumers.
///
/// A pass snapshots the pending list, applies every record concurrently and
/// settles each one independently: applied records are removed, failed ones
/// have their attempt count bumped and leave the queue once they reach
/// `max_retries`. Passes never overlap; a second caller waits for the running
/// pass and then works on a fresh snapshot.
pub struct SyncCoordinator {
    queue: Arc<MutationQueue>,
    registry: Arc<ConsumerRegistry>,
    config: SyncConfig,
    gate: Mutex<()>,
    syncing: AtomicBool,
    outcomes: broadcast::Sender<SyncOutcome>,
    metrics: SyncMetrics,
}

struct SyncingFlag<'a>(&'a AtomicBool);

impl<'a> SyncingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for SyncingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncCoordinator {
    pub fn new(
        queue: Arc<MutationQueue>,
        registry: Arc<ConsumerRegistry>,
        config: SyncConfig,
    ) -> Self {
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);
        Self {
            queue,
            registry,
            config,
            gate: Mutex::new(()),
            syncing: AtomicBool::new(false),
            outcomes,
            metrics: SyncMetrics::new(),
        }
    }

    pub fn queue(&self) -> &Arc<MutationQueue> {
        &self.queue
    }

    pub fn registry(&self) -> &Arc<ConsumerRegistry> {
        &self.registry
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Every non-empty pass is published here once it has settled.
    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<SyncOutcome> {
        self.outcomes.subscribe()
    }

    pub fn metrics_snapshot(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn run_sync_pass(&self) -> Result<SyncOutcome, AppError> {
        let _gate = self.gate.lock().await;
        let _flag = SyncingFlag::raise(&self.syncing);

        let pending = self.queue.list_pending().await?;
        if pending.is_empty() {
            debug!("Sync pass skipped: queue is empty");
            return Ok(SyncOutcome::default());
        }

        let started = Instant::now();
        info!(pending = pending.len(), "Sync pass started");

        let results = join_all(pending.iter().map(|record| self.apply_one(record))).await;

        let mut processed = 0u32;
        let mut failed = 0u32;
        let mut exhausted = 0u32;
        let mut store_error: Option<AppError> = None;

        // settle every record even if the store fails for one of them
        for (record, result) in pending.iter().zip(results) {
            let settled = match result {
                Ok(()) => self.queue.remove(&record.id).await.map(|_| processed += 1),
                Err(err) => {
                    failed += 1;
                    self.settle_failure(record, &err)
                        .await
                        .map(|left_queue| exhausted += u32::from(left_queue))
                }
            };
            if let Err(err) = settled {
                error!(mutation_id = %record.id, error = %err, "Failed to settle mutation");
                store_error.get_or_insert(err);
            }
        }

        if let Some(err) = store_error {
            return Err(err);
        }

        let remaining = self.queue.pending_count().await?;
        let outcome = SyncOutcome::new(
            processed,
            failed,
            exhausted,
            u32::try_from(remaining).unwrap_or(u32::MAX),
        );

        self.metrics.record_pass(&outcome, started.elapsed());
        let _ = self.outcomes.send(outcome);

        info!(
            processed = outcome.processed_count,
            failed = outcome.failed_count,
            exhausted = outcome.exhausted_count,
            pending = outcome.pending_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Sync pass finished"
        );
        Ok(outcome)
    }

    async fn apply_one(&self, record: &MutationRecord) -> Result<(), AppError> {
        let Some(consumer) = self.registry.get(&record.kind).await else {
            return Err(AppError::UnregisteredConsumer(record.kind.to_string()));
        };
        consumer.apply(record).await
    }

    /// Returns whether the record reached the retry bound and left the queue.
    async fn settle_failure(
        &self,
        record: &MutationRecord,
        err: &AppError,
    ) -> Result<bool, AppError> {
        let attempts = match self.queue.increment_attempts(&record.id).await {
            Ok(attempts) => attempts,
            Err(AppError::NotFound(_)) => {
                debug!(mutation_id = %record.id, "Failed record already left the queue");
                return Ok(false);
            }
            Err(other) => return Err(other),
        };

        warn!(
            mutation_id = %record.id,
            kind = %record.kind,
            attempts,
            max_retries = self.config.max_retries,
            error = %err,
            "Mutation apply failed"
        );

        if attempts < self.config.max_retries {
            return Ok(false);
        }

        if self.config.dead_letter_enabled {
            self.queue.dead_letter(&record.id, Some(err.to_string())).await?;
            warn!(
                mutation_id = %record.id,
                kind = %record.kind,
                "Mutation exhausted retries, dead-lettered"
            );
        } else {
            self.queue.remove(&record.id).await?;
            warn!(
                mutation_id = %record.id,
                kind = %record.kind,
                "Mutation exhausted retries, dropped"
            );
        }
        Ok(true)
    }
}
