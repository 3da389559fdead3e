use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Last successfully fetched copy of a read model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> SnapshotEntry<T> {
    pub fn new(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self { value, fetched_at }
    }

    /// Valid while `now - fetched_at < ttl`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.fetched_at) < ttl
    }
}
