use crate::domain::entities::SyncOutcome;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    Clean,
    Partial,
    Failed,
}

impl PassStatus {
    fn from_outcome(outcome: &SyncOutcome) -> Self {
        match (outcome.processed_count, outcome.failed_count) {
            (_, 0) => PassStatus::Clean,
            (0, _) => PassStatus::Failed,
            _ => PassStatus::Partial,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub total_passes: u64,
    pub total_processed: u64,
    pub total_failed: u64,
    pub total_exhausted: u64,
    pub consecutive_failed_passes: u64,
    pub last_pass_ms: Option<u64>,
    pub last_status: Option<PassStatus>,
    pub last_duration_ms: Option<u64>,
    pub last_outcome: Option<SyncOutcome>,
}

#[derive(Default, Clone)]
struct LastPass {
    status: Option<PassStatus>,
    duration_ms: Option<u64>,
    outcome: Option<SyncOutcome>,
}

/// Counters for completed sync passes. Empty passes are not recorded.
pub struct SyncMetrics {
    passes: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    exhausted: AtomicU64,
    consecutive_failed: AtomicU64,
    last_pass_ms: AtomicU64,
    last: Mutex<LastPass>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            passes: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            exhausted: AtomicU64::new(0),
            consecutive_failed: AtomicU64::new(0),
            last_pass_ms: AtomicU64::new(0),
            last: Mutex::new(LastPass::default()),
        }
    }

    pub fn record_pass(&self, outcome: &SyncOutcome, duration: Duration) {
        let status = PassStatus::from_outcome(outcome);

        self.passes.fetch_add(1, Ordering::Relaxed);
        self.processed
            .fetch_add(u64::from(outcome.processed_count), Ordering::Relaxed);
        self.failed
            .fetch_add(u64::from(outcome.failed_count), Ordering::Relaxed);
        self.exhausted
            .fetch_add(u64::from(outcome.exhausted_count), Ordering::Relaxed);
        self.last_pass_ms.store(current_unix_ms(), Ordering::Relaxed);

        if status == PassStatus::Clean {
            self.consecutive_failed.store(0, Ordering::Relaxed);
        } else {
            self.consecutive_failed.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut guard) = self.last.lock() {
            guard.status = Some(status);
            guard.duration_ms = Some(duration.as_millis() as u64);
            guard.outcome = Some(*outcome);
        }
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        let last = self
            .last
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|_| LastPass::default());

        SyncMetricsSnapshot {
            total_passes: self.passes.load(Ordering::Relaxed),
            total_processed: self.processed.load(Ordering::Relaxed),
            total_failed: self.failed.load(Ordering::Relaxed),
            total_exhausted: self.exhausted.load(Ordering::Relaxed),
            consecutive_failed_passes: self.consecutive_failed.load(Ordering::Relaxed),
            last_pass_ms: to_option(self.last_pass_ms.load(Ordering::Relaxed)),
            last_status: last.status,
            last_duration_ms: last.duration_ms,
            last_outcome: last.outcome,
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 { None } else { Some(value) }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
