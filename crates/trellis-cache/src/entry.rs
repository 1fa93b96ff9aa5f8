//! Cache entries and their access bookkeeping.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

/// A stored value plus the metadata needed for expiry and eviction.
///
/// Access bookkeeping (`last_accessed`, `access_count`, recency tick) uses
/// atomics so that hits can be recorded while holding only the shared lock.
#[derive(Debug)]
pub(crate) struct CacheEntry<V> {
    pub(crate) value: V,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) ttl: Option<Duration>,
    pub(crate) tags: BTreeSet<String>,
    last_accessed_micros: AtomicI64,
    access_count: AtomicU64,
    /// Monotonic recency stamp. Strictly orders accesses that share a timestamp.
    recency: AtomicU64,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(
        value: V,
        now: DateTime<Utc>,
        ttl: Option<Duration>,
        tags: BTreeSet<String>,
        recency: u64,
    ) -> Self {
        Self {
            value,
            created_at: now,
            ttl,
            tags,
            last_accessed_micros: AtomicI64::new(now.timestamp_micros()),
            access_count: AtomicU64::new(0),
            recency: AtomicU64::new(recency),
        }
    }

    /// An entry is expired once its age strictly exceeds its TTL.
    pub(crate) fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        // A negative age (clock moved backwards) is never expired.
        (now - self.created_at)
            .to_std()
            .is_ok_and(|age| age > ttl)
    }

    /// Record a read hit.
    pub(crate) fn touch(&self, now: DateTime<Utc>, recency: u64) {
        self.last_accessed_micros
            .store(now.timestamp_micros(), Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
        self.recency.fetch_max(recency, Ordering::Relaxed);
    }

    pub(crate) fn recency(&self) -> u64 {
        self.recency.load(Ordering::Relaxed)
    }

    pub(crate) fn metadata(&self, key: &str) -> EntryMetadata {
        let micros = self.last_accessed_micros.load(Ordering::Relaxed);
        EntryMetadata {
            key: key.to_string(),
            created_at: self.created_at,
            last_accessed: DateTime::from_timestamp_micros(micros).unwrap_or(self.created_at),
            access_count: self.access_count.load(Ordering::Relaxed),
            ttl: self.ttl,
            tags: self.tags.clone(),
        }
    }
}

/// Read-only view of an entry's bookkeeping, without its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryMetadata {
    /// The entry's key.
    pub key: String,
    /// When the value was stored (replacing a key resets this).
    pub created_at: DateTime<Utc>,
    /// When the entry was last read, or `created_at` if never read.
    pub last_accessed: DateTime<Utc>,
    /// Number of successful reads.
    pub access_count: u64,
    /// Time-to-live, if any.
    pub ttl: Option<Duration>,
    /// Tags attached at insertion.
    pub tags: BTreeSet<String>,
}
