//! Integration tests for cache expiry, eviction, invalidation and the
//! background sweeper.
//!
//! Time is driven by `ManualClock`, so no test sleeps waiting for a TTL.

use chrono::TimeDelta;
use rstest::rstest;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use trellis_cache::clock::ManualClock;
use trellis_cache::{Cache, CacheConfig};

fn config(capacity: usize) -> CacheConfig {
    CacheConfig {
        capacity,
        default_ttl_secs: None,
        sweep_interval_secs: 60,
    }
}

fn cache(capacity: usize) -> (Cache<String>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    (Cache::with_clock(config(capacity), clock.clone()), clock)
}

/// Poll `condition` until it holds or `timeout` elapses.
fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// ========== Expiry ==========

#[test]
fn value_is_readable_until_ttl_passes() {
    let (cache, clock) = cache(10);
    let ttl = Duration::from_secs(30);

    assert!(cache.set("k", "v".to_string(), Some(ttl), &[]));
    assert_eq!(cache.get("k").as_deref(), Some("v"));

    clock.advance(TimeDelta::seconds(30));
    assert_eq!(cache.get("k").as_deref(), Some("v"), "age == ttl is still live");

    clock.advance(TimeDelta::seconds(1));
    assert!(cache.get("k").is_none());
}

#[test]
fn expired_entry_is_removed_on_read() {
    let (cache, clock) = cache(10);
    cache.set("k", "v".to_string(), Some(Duration::from_secs(1)), &["t"]);

    clock.advance(TimeDelta::seconds(2));
    assert_eq!(cache.len(), 1, "expired entries linger until read or swept");

    assert!(cache.get("k").is_none());
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.invalidate_by_tag("t"), 0, "tag index cleaned up too");

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.expirations, 1);
}

#[test]
fn default_ttl_applies_when_none_given() {
    let clock = Arc::new(ManualClock::default());
    let config = CacheConfig {
        capacity: 10,
        default_ttl_secs: Some(5),
        sweep_interval_secs: 60,
    };
    let cache: Cache<u8> = Cache::with_clock(config, clock.clone());

    cache.insert("k", 1);
    clock.advance(TimeDelta::seconds(6));
    assert!(cache.get("k").is_none());
}

#[test]
fn purge_expired_removes_only_stale_entries() {
    let (cache, clock) = cache(10);
    cache.set("stale-1", "a".into(), Some(Duration::from_secs(1)), &[]);
    cache.set("stale-2", "b".into(), Some(Duration::from_secs(1)), &[]);
    cache.set("fresh", "c".into(), Some(Duration::from_secs(100)), &[]);
    cache.set("forever", "d".into(), None, &[]);

    clock.advance(TimeDelta::seconds(10));

    assert_eq!(cache.purge_expired(), 2);
    assert_eq!(cache.len(), 2);
    assert!(cache.get("fresh").is_some());
    assert!(cache.get("forever").is_some());
}

// ========== LRU Eviction ==========

#[rstest]
#[case::capacity_one(1)]
#[case::capacity_three(3)]
#[case::capacity_ten(10)]
fn overflow_evicts_exactly_the_oldest_key(#[case] capacity: usize) {
    let (cache, _) = cache(capacity);

    for i in 0..=capacity {
        assert!(cache.insert(format!("k{i}"), i.to_string()));
    }

    assert_eq!(cache.len(), capacity);
    assert_eq!(cache.stats().evictions, 1);
    assert!(cache.metadata("k0").is_none(), "first key should be evicted");
    for i in 1..=capacity {
        assert!(cache.metadata(&format!("k{i}")).is_some());
    }
}

#[test]
fn reading_a_key_protects_it_from_eviction() {
    let (cache, _) = cache(3);
    cache.insert("a", "1".into());
    cache.insert("b", "2".into());
    cache.insert("c", "3".into());

    // "a" becomes most recent; "b" is now the least recently used.
    assert!(cache.get("a").is_some());
    cache.insert("d", "4".into());

    assert!(cache.get("a").is_some());
    assert!(cache.metadata("b").is_none());
    assert!(cache.get("c").is_some());
    assert!(cache.get("d").is_some());
}

#[test]
fn size_never_exceeds_capacity() {
    let (cache, _) = cache(5);
    for i in 0..100 {
        cache.insert(format!("k{i}"), String::new());
        assert!(cache.len() <= 5);
    }
    assert_eq!(cache.stats().evictions, 95);
}

// ========== Invalidation ==========

#[test]
fn tag_invalidation_removes_exactly_tagged_entries() {
    let (cache, _) = cache(10);
    cache.set("g1", "a".into(), None, &["graph"]);
    cache.set("g2", "b".into(), None, &["graph", "cycles"]);
    cache.set("c1", "c".into(), None, &["cycles"]);
    cache.set("plain", "d".into(), None, &[]);

    assert_eq!(cache.invalidate_by_tag("graph"), 2);

    assert!(cache.get("g1").is_none());
    assert!(cache.get("g2").is_none());
    assert!(cache.get("c1").is_some());
    assert!(cache.get("plain").is_some());

    // g2 is gone, so only c1 still carries "cycles".
    assert_eq!(cache.invalidate_by_tag("cycles"), 1);
    assert_eq!(cache.invalidate_by_tag("missing"), 0);
}

#[test]
fn pattern_invalidation_matches_globs() {
    let (cache, _) = cache(10);
    cache.insert("graph:v1", "a".into());
    cache.insert("graph:v2", "b".into());
    cache.insert("cycles:v2", "c".into());

    assert_eq!(cache.invalidate_by_pattern("graph:*"), 2);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.invalidate_by_pattern("*:v?"), 1);
    assert!(cache.is_empty());
}

#[test]
fn delete_and_clear_report_outcome() {
    let (cache, _) = cache(10);
    cache.insert("a", "1".into());
    cache.insert("b", "2".into());

    assert!(cache.delete("a"));
    assert!(!cache.delete("a"));
    assert!(cache.clear());
    assert!(cache.is_empty());
    assert_eq!(cache.stats().invalidations, 2);
}

// ========== Sweeper ==========

#[test]
fn sweeper_removes_expired_entries_without_reads() {
    let (cache, clock) = cache(10);
    cache.set("k", "v".into(), Some(Duration::from_secs(1)), &[]);
    clock.advance(TimeDelta::seconds(2));

    let handle = cache.spawn_sweeper(Duration::from_millis(10)).unwrap();
    assert!(handle.is_running());

    assert!(wait_until(Duration::from_secs(5), || cache.is_empty()));
    handle.shutdown();
    assert_eq!(cache.stats().hits + cache.stats().misses, 0);
}

#[test]
fn sweeper_shutdown_joins_thread() {
    let (cache, _) = cache(10);
    let handle = cache.spawn_sweeper(Duration::from_secs(3600)).unwrap();
    assert_eq!(handle.interval(), Duration::from_secs(3600));

    let started = Instant::now();
    handle.shutdown();
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "shutdown must not wait for the next tick"
    );
}

#[test]
fn sweeper_exits_when_cache_dropped() {
    let (cache, _) = cache(10);
    let handle = cache.spawn_sweeper(Duration::from_millis(5)).unwrap();
    drop(cache);

    assert!(wait_until(Duration::from_secs(5), || !handle.is_running()));
}

// ========== Concurrency ==========

#[test]
fn concurrent_readers_and_writers_keep_capacity() {
    let (cache, _) = cache(50);
    let mut workers = Vec::new();

    for t in 0..4 {
        let cache = cache.clone();
        workers.push(thread::spawn(move || {
            for i in 0..200 {
                let key = format!("t{t}-k{}", i % 80);
                cache.insert(key.clone(), i.to_string());
                let _ = cache.get(&key);
                if i % 25 == 0 {
                    cache.invalidate_by_pattern(&format!("t{t}-*"));
                }
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(cache.len() <= 50);
    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, 800);
}
