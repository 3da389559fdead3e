use crate::application::services::sync_coordinator::SyncCoordinator;
use crate::domain::entities::SyncOutcome;
use crate::infrastructure::connectivity::{ConnectivityEvent, ConnectivityObserver};
use crate::shared::error::AppError;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Receives the result of every pass the job runs.
pub trait SyncOutcomeEmitter: Send + Sync {
    fn emit_outcome(&self, outcome: &SyncOutcome) -> Result<(), String>;
    fn emit_failure(&self, message: &str) -> Result<(), String>;
}

/// Runs sync passes in the background on demand or on reconnect.
///
/// Overlapping triggers queue up behind the coordinator's own pass gate.
pub struct SyncJob {
    event_emitter: Option<Arc<dyn SyncOutcomeEmitter>>,
    coordinator: Arc<SyncCoordinator>,
}

impl SyncJob {
    pub fn create(coordinator: Arc<SyncCoordinator>) -> Arc<Self> {
        Self::with_emitter(None, coordinator)
    }

    pub fn with_emitter(
        event_emitter: Option<Arc<dyn SyncOutcomeEmitter>>,
        coordinator: Arc<SyncCoordinator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            event_emitter,
            coordinator,
        })
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    pub fn trigger(self: &Arc<Self>) -> JoinHandle<()> {
        let job = Arc::clone(self);
        tokio::spawn(async move {
            job.run_guarded().await;
        })
    }

    pub async fn sync_once(&self) -> Result<SyncOutcome, AppError> {
        self.coordinator.run_sync_pass().await
    }

    /// Starts a pass every time `observer` reports the remote reachable again.
    ///
    /// The watcher stops once the observer is dropped.
    pub fn watch_connectivity(self: &Arc<Self>, observer: &ConnectivityObserver) -> JoinHandle<()> {
        let job = Arc::clone(self);
        let mut events = observer.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ConnectivityEvent::BecameReachable) => {
                        tracing::debug!(
                            target: "offline_sync::sync_job",
                            "remote reachable again, starting sync pass"
                        );
                        Arc::clone(&job).run_guarded().await;
                    }
                    Ok(ConnectivityEvent::BecameUnreachable) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(
                            target: "offline_sync::sync_job",
                            skipped,
                            "connectivity watcher lagged"
                        );
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn run_guarded(self: Arc<Self>) {
        match self.sync_once().await {
            Ok(outcome) => self.emit_success(&outcome),
            Err(err) => self.emit_failure(&err.to_string()),
        }
    }

    fn emit_success(&self, outcome: &SyncOutcome) {
        if let Some(emitter) = &self.event_emitter {
            if let Err(err) = emitter.emit_outcome(outcome) {
                tracing::warn!(
                    target: "offline_sync::sync_job",
                    error = %err,
                    "failed to emit sync outcome"
                );
            }
        }
        tracing::info!(
            target: "offline_sync::sync_job",
            processed = outcome.processed_count,
            failed = outcome.failed_count,
            pending = outcome.pending_count,
            "sync job completed"
        );
    }

    fn emit_failure(&self, message: &str) {
        if let Some(emitter) = &self.event_emitter {
            if let Err(err) = emitter.emit_failure(message) {
                tracing::warn!(
                    target: "offline_sync::sync_job",
                    error = %err,
                    "failed to emit sync failure"
                );
            }
        }
        tracing::error!(
            target: "offline_sync::sync_job",
            error = message,
            "sync job failed"
        );
    }
}
