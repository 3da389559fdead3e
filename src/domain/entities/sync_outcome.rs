use serde::{Deserialize, Serialize};

/// Aggregate result of one sync pass, published to observers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Records applied and removed this pass.
    pub processed_count: u32,
    /// Records whose apply failed this pass, including exhausted ones.
    pub failed_count: u32,
    /// Subset of `failed_count` that reached the retry bound this pass.
    pub exhausted_count: u32,
    /// Queue length once the pass finished.
    pub pending_count: u32,
}

impl SyncOutcome {
    pub fn new(
        processed_count: u32,
        failed_count: u32,
        exhausted_count: u32,
        pending_count: u32,
    ) -> Self {
        Self {
            processed_count,
            failed_count,
            exhausted_count,
            pending_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.processed_count == 0 && self.failed_count == 0
    }
}
