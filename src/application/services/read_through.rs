use crate::application::services::snapshot_cache::SnapshotCache;
use crate::domain::value_objects::CacheKey;
use crate::infrastructure::connectivity::ConnectivityObserver;
use crate::shared::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Live,
    Cached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadResult<T> {
    pub value: T,
    pub source: ReadSource,
}

/// Fetches a read model live when the remote is reachable and falls back to the
/// snapshot cache when it is not, or when the live fetch fails.
///
/// Successful live fetches refresh the snapshot. A failed snapshot write does
/// not hide fresh data from the caller.
pub async fn read_through<T, F, Fut>(
    cache: &SnapshotCache,
    connectivity: &ConnectivityObserver,
    key: &CacheKey,
    fetch: F,
) -> Result<ReadResult<T>, AppError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    if !connectivity.is_reachable() {
        return match cache.get::<T>(key).await? {
            Some(value) => Ok(ReadResult {
                value,
                source: ReadSource::Cached,
            }),
            None => Err(AppError::Network(format!(
                "Remote unreachable and no snapshot cached for {key}"
            ))),
        };
    }

    match fetch().await {
        Ok(value) => {
            if let Err(err) = cache.put(key, &value).await {
                error!(cache_key = %key, error = %err, "Failed to refresh snapshot");
            }
            Ok(ReadResult {
                value,
                source: ReadSource::Live,
            })
        }
        Err(fetch_err) => {
            warn!(cache_key = %key, error = %fetch_err, "Live fetch failed, trying snapshot");
            match cache.get::<T>(key).await? {
                Some(value) => Ok(ReadResult {
                    value,
                    source: ReadSource::Cached,
                }),
                None => Err(fetch_err),
            }
        }
    }
}
