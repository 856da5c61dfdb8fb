//! Configuration for a log tail

use serde::{Deserialize, Serialize};

/// Default upper bound for a single encoded record (10 MiB)
pub const DEFAULT_MAX_RECORD_SIZE: u32 = 10 * 1024 * 1024;

/// Tuning knobs for [`FileLogTail`](crate::FileLogTail)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    /// Sync file data to disk after every append
    pub sync_on_write: bool,
    /// Largest accepted record payload; bigger length prefixes are treated as corruption
    pub max_record_size: u32,
    /// Create missing parent directories when opening for write
    pub create_parent_dirs: bool,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            sync_on_write: false,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
            create_parent_dirs: true,
        }
    }
}

impl TailConfig {
    /// Create config from environment variables
    ///
    /// Reads `LOGTAIL_SYNC_ON_WRITE` and `LOGTAIL_MAX_RECORD_SIZE`; unset or
    /// unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(sync) = lookup("LOGTAIL_SYNC_ON_WRITE").and_then(|v| parse_bool(&v)) {
            config = config.with_sync_on_write(sync);
        }
        if let Some(max) =
            lookup("LOGTAIL_MAX_RECORD_SIZE").and_then(|v| v.trim().parse::<u32>().ok())
        {
            config = config.with_max_record_size(max);
        }
        config
    }

    /// Set whether every append is synced to disk
    pub fn with_sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }

    /// Set the maximum record payload size
    pub fn with_max_record_size(mut self, max: u32) -> Self {
        self.max_record_size = max.max(1);
        self
    }

    /// Set whether parent directories are created on write
    pub fn with_create_parent_dirs(mut self, create: bool) -> Self {
        self.create_parent_dirs = create;
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
