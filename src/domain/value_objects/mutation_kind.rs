use serde::{Deserialize, Serialize};
use std::fmt;

/// Names the domain operation a queued mutation performs (e.g. `create`, `update`).
///
/// The queue treats the kind as an opaque routing key; only the consumer
/// registered for it knows what the payload means.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutationKind(String);

impl MutationKind {
    pub const CREATE: &'static str = "create";
    pub const UPDATE: &'static str = "update";

    pub fn new(value: String) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn create() -> Self {
        Self(Self::CREATE.to_string())
    }

    pub fn update() -> Self {
        Self(Self::UPDATE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Mutation kind cannot be empty".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<MutationKind> for String {
    fn from(kind: MutationKind) -> Self {
        kind.0
    }
}
