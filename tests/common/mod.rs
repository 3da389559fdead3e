#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use offline_sync::shared::config::{AppConfig, DatabaseConfig};
use offline_sync::{AppError, FnConsumer, MutationConsumer, MutationRecord, OfflineSyncState};

pub fn sqlite_config(dir: &Path) -> AppConfig {
    AppConfig {
        database: DatabaseConfig {
            url: format!("sqlite:{}", dir.join("offline_sync.db").display()),
            max_connections: 1,
        },
        ..AppConfig::default()
    }
}

pub async fn open_state(dir: &Path) -> OfflineSyncState {
    OfflineSyncState::initialize(&sqlite_config(dir))
        .await
        .expect("offline state")
}

/// Consumer that records every payload it accepts.
pub fn recording_consumer() -> (Arc<dyn MutationConsumer>, Arc<Mutex<Vec<MutationRecord>>>) {
    let applied: Arc<Mutex<Vec<MutationRecord>>> = Arc::default();
    let sink = applied.clone();
    let consumer: Arc<dyn MutationConsumer> =
        Arc::new(FnConsumer::new(move |record: MutationRecord| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(record);
                Ok::<(), AppError>(())
            }
        }));
    (consumer, applied)
}

pub fn rejecting_consumer() -> Arc<dyn MutationConsumer> {
    Arc::new(FnConsumer::new(|_record: MutationRecord| async {
        Err::<(), _>(AppError::ApplyFailed("rejected by server".to_string()))
    }))
}
