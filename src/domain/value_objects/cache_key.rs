use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Names one read-model snapshot, e.g. `menu` or `tables:floor-1`.
///
/// The key is stored verbatim after the snapshot namespace prefix, so it must
/// survive being read back from a storage key unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey(String);

impl CacheKey {
    pub const MAX_LEN: usize = 256;

    pub fn new(value: String) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full storage key under `namespace`.
    pub fn scoped(&self, namespace: &str) -> String {
        format!("{namespace}{}", self.0)
    }

    /// Inverse of [`scoped`](Self::scoped). `None` when `stored` lies outside
    /// `namespace` or the remainder is not a valid key.
    pub fn from_scoped(namespace: &str, stored: &str) -> Option<Self> {
        let raw = stored.strip_prefix(namespace)?;
        Self::new(raw.to_string()).ok()
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.is_empty() {
            return Err("Cache key cannot be empty".to_string());
        }
        if value.len() > Self::MAX_LEN {
            return Err(format!("Cache key exceeds {} bytes", Self::MAX_LEN));
        }
        if value.trim() != value {
            return Err("Cache key cannot start or end with whitespace".to_string());
        }
        if value.chars().any(char::is_control) {
            return Err("Cache key cannot contain control characters".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CacheKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for CacheKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
