//! Cache configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default maximum number of entries.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default time-to-live applied when `set` is called without one.
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Default interval between background expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Tunables for a [`Cache`](crate::Cache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CacheConfig {
    /// Maximum number of live entries. Inserting a new key at capacity
    /// evicts the least recently accessed entry first.
    pub capacity: usize,

    /// TTL applied to entries stored without an explicit one.
    /// `None` means such entries never expire.
    pub default_ttl_secs: Option<u64>,

    /// Interval between background sweeps of expired entries.
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    /// The default TTL as a [`Duration`].
    #[must_use]
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_secs.map(Duration::from_secs)
    }

    /// The sweep interval as a [`Duration`].
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_ttl_secs: Some(DEFAULT_TTL_SECS),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}
