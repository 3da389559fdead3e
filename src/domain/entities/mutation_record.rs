use crate::domain::value_objects::{MutationId, MutationKind, MutationPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pending state-changing intent held by the mutation queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    pub id: MutationId,
    pub enqueued_at: DateTime<Utc>,
    pub kind: MutationKind,
    pub payload: MutationPayload,
    pub attempts: u32,
}

impl MutationRecord {
    pub fn new(kind: MutationKind, payload: MutationPayload, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id: MutationId::generate(),
            enqueued_at,
            kind,
            payload,
            attempts: 0,
        }
    }

    pub fn record_failed_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }
}
