//! Offline-tolerant mutation queue and synchronization.
//!
//! Writes made while the remote authority is unreachable are persisted in a
//! [`MutationQueue`] and replayed by a [`SyncCoordinator`] once a pass is
//! triggered. Read models survive outages through the [`SnapshotCache`].

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::{Clock, FnConsumer, KeyValueStore, MutationConsumer};
pub use application::services::{
    read_through, ConsumerRegistry, MutationDispatcher, MutationQueue, ReadResult, ReadSource,
    SnapshotCache, SubmitOutcome, SyncCoordinator,
};
pub use domain::entities::{DeadLetterRecord, MutationRecord, SnapshotEntry, SyncOutcome};
pub use domain::value_objects::{CacheKey, MutationId, MutationKind, MutationPayload};
pub use infrastructure::connectivity::{ConnectivityEvent, ConnectivityObserver};
pub use infrastructure::jobs::{SyncJob, SyncOutcomeEmitter};
pub use shared::{AppConfig, AppError, Result};
pub use state::OfflineSyncState;

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default filter.
///
/// Calling it more than once is harmless.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_sync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
