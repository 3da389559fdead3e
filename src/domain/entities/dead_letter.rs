use super::MutationRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mutation that used up its retry budget and was set aside for manual handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterRecord {
    pub record: MutationRecord,
    pub exhausted_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl DeadLetterRecord {
    pub fn new(
        record: MutationRecord,
        exhausted_at: DateTime<Utc>,
        last_error: Option<String>,
    ) -> Self {
        Self {
            record,
            exhausted_at,
            last_error,
        }
    }
}
