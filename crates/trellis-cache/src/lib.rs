//! An in-process key/value cache with TTL expiry, LRU eviction and tag
//! invalidation.
//!
//! # Semantics
//!
//! - **Expiry**: an entry whose age exceeds its TTL is treated as absent.
//!   Expiry is checked lazily on [`Cache::get`] (the stale entry is removed
//!   on the spot) and proactively by an optional background sweeper
//!   ([`Cache::spawn_sweeper`]).
//! - **Eviction**: the number of entries never exceeds the configured
//!   capacity. Inserting a *new* key at capacity first drops expired entries,
//!   then evicts the least recently accessed one.
//! - **Tags**: every entry may carry tags. A reverse `tag -> keys` index is
//!   maintained with each insert and removal, so [`Cache::invalidate_by_tag`]
//!   costs O(entries with that tag).
//! - **Failure**: operations never return errors. A poisoned lock is logged
//!   and reported as a miss, `false` or `0`. A broken cache costs
//!   performance, not correctness.
//!
//! # Concurrency
//!
//! State lives behind a single `RwLock`. Reads of live entries take the shared
//! lock (recency and hit counts are atomics); every mutation, including the
//! sweep, takes the exclusive lock. [`Cache`] is a cheap handle and can be
//! cloned across threads.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use trellis_cache::{Cache, CacheConfig};
//!
//! let cache: Cache<String> = Cache::new(CacheConfig::default());
//! cache.set("user:1", "alice".to_string(), Some(Duration::from_secs(60)), &["users"]);
//!
//! assert_eq!(cache.get("user:1").as_deref(), Some("alice"));
//! assert_eq!(cache.invalidate_by_tag("users"), 1);
//! assert!(cache.get("user:1").is_none());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
mod entry;
pub mod error;
pub mod pattern;
mod stats;
mod sweeper;

pub use clock::{Clock, SystemClock};
pub use config::CacheConfig;
pub use entry::EntryMetadata;
pub use error::{Error, Result};
pub use stats::CacheStats;
pub use sweeper::SweepHandle;

use chrono::{DateTime, Utc};
use entry::CacheEntry;
use stats::Counters;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// A thread-safe TTL/LRU/tag cache keyed by strings.
///
/// Cloning a `Cache` yields another handle to the same storage.
pub struct Cache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> std::fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.inner.config)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Shared state behind every [`Cache`] handle and the sweeper.
pub(crate) struct Inner<V> {
    state: RwLock<State<V>>,
    counters: Counters,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    recency: AtomicU64,
}

/// Entries plus the reverse tag index. Only mutated through `insert` and
/// `remove` so the two never disagree.
struct State<V> {
    entries: HashMap<String, CacheEntry<V>>,
    tag_index: HashMap<String, HashSet<String>>,
}

impl<V> State<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            tag_index: HashMap::new(),
        }
    }

    fn insert(&mut self, key: String, entry: CacheEntry<V>) {
        for tag in &entry.tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        self.entries.insert(key, entry);
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        for tag in &entry.tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entry)
    }

    fn remove_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    fn evict_least_recent(&mut self) -> Option<String> {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.recency())
            .map(|(key, _)| key.clone())?;
        self.remove(&victim);
        Some(victim)
    }

    fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        self.tag_index.clear();
        n
    }
}

impl<V> Inner<V> {
    fn read(&self, op: &'static str) -> Option<RwLockReadGuard<'_, State<V>>> {
        match self.state.read() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!(op, error = %e, "Cache lock poisoned");
                None
            }
        }
    }

    fn write(&self, op: &'static str) -> Option<RwLockWriteGuard<'_, State<V>>> {
        match self.state.write() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!(op, error = %e, "Cache lock poisoned");
                None
            }
        }
    }

    fn next_recency(&self) -> u64 {
        self.recency.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Remove every expired entry under one exclusive lock.
    pub(crate) fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let Some(mut state) = self.write("purge_expired") else {
            return 0;
        };
        let removed = state.remove_expired(now);
        self.counters.expired(removed);
        removed
    }
}

impl<V> Cache<V> {
    /// Create a cache that reads time from the system clock.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache that reads time from `clock`.
    #[must_use]
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::new()),
                counters: Counters::default(),
                clock,
                config,
                recency: AtomicU64::new(0),
            }),
        }
    }

    /// The configuration this cache was built with.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Store `value` under `key`.
    ///
    /// `ttl` of `None` falls back to the configured default TTL. Replacing an
    /// existing key resets its age, recency and tags. Inserting a new key at
    /// capacity drops expired entries and then evicts the least recently
    /// accessed entry.
    ///
    /// Returns `false` if the value could not be stored.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> bool {
        let key = key.into();
        let capacity = self.inner.config.capacity;
        if capacity == 0 {
            debug!(key = %key, "Cache capacity is zero, not storing");
            return false;
        }

        let now = self.inner.clock.now();
        let ttl = ttl.or_else(|| self.inner.config.default_ttl());
        let tags: BTreeSet<String> = tags.iter().map(|t| (*t).to_string()).collect();

        let Some(mut state) = self.inner.write("set") else {
            return false;
        };

        if state.entries.contains_key(&key) {
            state.remove(&key);
        } else if state.entries.len() >= capacity {
            let expired = state.remove_expired(now);
            self.inner.counters.expired(expired);

            while state.entries.len() >= capacity {
                let Some(victim) = state.evict_least_recent() else {
                    break;
                };
                self.inner.counters.evicted(1);
                debug!(victim = %victim, "Evicted least recently used cache entry");
            }
        }

        let entry = CacheEntry::new(value, now, ttl, tags, self.inner.next_recency());
        state.insert(key, entry);
        true
    }

    /// Store `value` under `key` with the default TTL and no tags.
    pub fn insert(&self, key: impl Into<String>, value: V) -> bool {
        self.set(key, value, None, &[])
    }

    /// Remove `key`. Returns `true` if an entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        let Some(mut state) = self.inner.write("delete") else {
            return false;
        };
        let removed = state.remove(key).is_some();
        if removed {
            self.inner.counters.invalidated(1);
        }
        removed
    }

    /// Remove every entry. Returns `false` only on internal failure.
    pub fn clear(&self) -> bool {
        let Some(mut state) = self.inner.write("clear") else {
            return false;
        };
        let removed = state.clear();
        self.inner.counters.invalidated(removed);
        debug!(removed, "Cleared cache");
        true
    }

    /// Remove every entry carrying `tag`. Returns the number removed.
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        let Some(mut state) = self.inner.write("invalidate_by_tag") else {
            return 0;
        };
        let Some(keys) = state.tag_index.get(tag).cloned() else {
            return 0;
        };
        let removed = keys
            .iter()
            .filter(|key| state.remove(key).is_some())
            .count();
        self.inner.counters.invalidated(removed);
        debug!(tag, removed, "Invalidated cache entries by tag");
        removed
    }

    /// Remove every entry whose key matches the glob `pattern`
    /// (see [`pattern::glob_match`]). Returns the number removed.
    pub fn invalidate_by_pattern(&self, pattern: &str) -> usize {
        let Some(mut state) = self.inner.write("invalidate_by_pattern") else {
            return 0;
        };
        let matching: Vec<String> = state
            .entries
            .keys()
            .filter(|key| pattern::glob_match(pattern, key))
            .cloned()
            .collect();
        for key in &matching {
            state.remove(key);
        }
        self.inner.counters.invalidated(matching.len());
        debug!(pattern, removed = matching.len(), "Invalidated cache entries by pattern");
        matching.len()
    }

    /// Drop every expired entry now. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    /// Activity counters plus the current size.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.counters.snapshot(self.len())
    }

    /// Number of entries physically present, expired ones included until
    /// they are read or swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read("len").map_or(0, |state| state.entries.len())
    }

    /// Returns `true` if no entries are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bookkeeping for `key` without counting as an access.
    ///
    /// Expired entries still present are reported; use [`Cache::get`] for
    /// liveness.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<EntryMetadata> {
        let state = self.inner.read("metadata")?;
        state.entries.get(key).map(|entry| entry.metadata(key))
    }
}

impl<V: Clone> Cache<V> {
    /// Fetch the live value for `key`.
    ///
    /// A hit refreshes the entry's recency. An expired entry counts as a
    /// miss and is removed before returning.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.inner.clock.now();

        {
            let Some(state) = self.inner.read("get") else {
                self.inner.counters.miss();
                return None;
            };
            match state.entries.get(key) {
                None => {
                    self.inner.counters.miss();
                    return None;
                }
                Some(entry) if !entry.is_expired(now) => {
                    entry.touch(now, self.inner.next_recency());
                    self.inner.counters.hit();
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // Expired: retake the lock exclusively and remove it, unless a writer
        // replaced it in between.
        if let Some(mut state) = self.inner.write("get") {
            if state.entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
                state.remove(key);
                self.inner.counters.expired(1);
                debug!(key, "Removed expired cache entry on read");
            }
        }
        self.inner.counters.miss();
        None
    }
}

impl<V: Send + Sync + 'static> Cache<V> {
    /// Start a background thread that purges expired entries every
    /// `interval`.
    ///
    /// The returned handle stops the thread when shut down or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if the OS refuses to create the thread.
    pub fn spawn_sweeper(&self, interval: Duration) -> Result<SweepHandle> {
        Ok(SweepHandle::spawn(Arc::downgrade(&self.inner), interval)?)
    }
}
