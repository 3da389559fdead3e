use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Failed apply attempts after which a record leaves the pending queue.
    pub max_retries: u32,
    /// Keep exhausted records in the dead-letter list instead of dropping them.
    pub dead_letter_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    /// Entries kept in the in-memory front of the snapshot cache.
    pub capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            sync: SyncConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:data/offline_sync.db".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            dead_letter_enabled: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60, // 24 hours
            capacity: 128,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("OFFLINE_SYNC_DATABASE_URL") {
            let url = v.trim();
            if !url.is_empty() {
                cfg.database.url = url.to_string();
            }
        }
        if let Some(value) = lookup("OFFLINE_SYNC_MAX_CONNECTIONS").and_then(|v| parse_u32(&v)) {
            cfg.database.max_connections = value.max(1);
        }

        if let Some(value) = lookup("OFFLINE_SYNC_MAX_RETRIES").and_then(|v| parse_u32(&v)) {
            cfg.sync.max_retries = value.max(1);
        }
        if let Some(v) = lookup("OFFLINE_SYNC_DEAD_LETTER") {
            cfg.sync.dead_letter_enabled = parse_bool(&v, cfg.sync.dead_letter_enabled);
        }

        if let Some(value) = lookup("OFFLINE_SYNC_CACHE_TTL_SECS").and_then(|v| parse_u64(&v)) {
            cfg.cache.ttl_secs = value.max(1);
        }
        if let Some(value) = lookup("OFFLINE_SYNC_CACHE_CAPACITY").and_then(|v| parse_u64(&v)) {
            cfg.cache.capacity = usize::try_from(value).unwrap_or(usize::MAX).max(1);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.trim().is_empty() {
            return Err("Database url cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.max_retries == 0 {
            return Err("Sync max_retries must be greater than 0".to_string());
        }
        if self.cache.ttl_secs == 0 {
            return Err("Cache ttl_secs must be greater than 0".to_string());
        }
        if self.cache.capacity == 0 {
            return Err("Cache capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}
