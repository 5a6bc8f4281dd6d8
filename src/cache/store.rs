//! In-memory response cache bounded by age and entry count

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::client::clock::Clock;

/// Hit/miss/eviction counters for one cache
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
    last_access: u64,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    tick: u64,
    stats: CacheStats,
}

/// Cache of previously fetched responses.
///
/// Entries older than the TTL are treated as absent. When an insert would
/// exceed `capacity`, expired entries are purged first and then the
/// least-recently-accessed entry is evicted.
pub struct TtlCache<V> {
    name: &'static str,
    capacity: usize,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            capacity: capacity.max(1),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                tick: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_live(&self, entry: &Entry<V>, now: DateTime<Utc>) -> bool {
        now - entry.stored_at < self.ttl
    }

    /// Return the live value for `key`, refreshing its recency
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        let live = inner
            .entries
            .get(key)
            .map(|entry| self.is_live(entry, now));

        match live {
            Some(true) => {
                inner.stats.hits += 1;
                let entry = inner.entries.get_mut(key)?;
                entry.last_access = tick;
                Some(entry.value.clone())
            }
            Some(false) => {
                inner.entries.remove(key);
                inner.stats.misses += 1;
                None
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Store `value` under `key`, stamped with the current time
    pub fn insert(&self, key: &str, value: V) {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.capacity {
            inner
                .entries
                .retain(|_, entry| now - entry.stored_at < self.ttl);

            while inner.entries.len() >= self.capacity {
                let Some(oldest) = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_access)
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                inner.entries.remove(&oldest);
                inner.stats.evictions += 1;
                log::debug!("Cache {}: evicted least recently used entry", self.name);
            }
        }

        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                stored_at: now,
                last_access: tick,
            },
        );
    }

    /// Return the live value for `key`, or run `loader` and cache its result.
    ///
    /// A failed load leaves the cache untouched and returns the loader's error.
    /// The lock is not held while `loader` runs; concurrent misses on the same
    /// key each load, and the last one to finish wins.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            log::debug!("Cache hit: {}", self.name);
            return Ok(value);
        }

        log::debug!("Cache miss: {}", self.name);
        let value = loader().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    #[allow(dead_code)]
    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    #[allow(dead_code)]
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of held entries, live or not yet purged
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::client::clock::ManualClock;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn cache(capacity: usize, clock: Arc<ManualClock>) -> TtlCache<String> {
        TtlCache::new("test", capacity, HOUR, clock)
    }

    async fn load(
        cache: &TtlCache<String>,
        key: &str,
        calls: &AtomicUsize,
    ) -> Result<String, String> {
        cache
            .get_or_fetch(key, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(format!("{}#{}", key, n))
            })
            .await
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_uses_cached_value() {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = cache(10, clock.clone());
        let calls = AtomicUsize::new(0);

        let first = load(&cache, "k", &calls).await.unwrap();
        clock.advance_secs(3599);
        let second = load(&cache, "k", &calls).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_reloaded() {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = cache(10, clock.clone());
        let calls = AtomicUsize::new(0);

        load(&cache, "k", &calls).await.unwrap();
        clock.advance_secs(3600);
        let reloaded = load(&cache, "k", &calls).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(reloaded, "k#2");
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache = cache(10, Arc::new(ManualClock::at_epoch()));

        let failed: Result<String, String> = cache
            .get_or_fetch("k", || async { Err("upstream down".to_string()) })
            .await;
        assert_eq!(failed.unwrap_err(), "upstream down");
        assert!(cache.is_empty());

        let calls = AtomicUsize::new(0);
        load(&cache, "k", &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_accessed() {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = cache(2, clock);
        let calls = AtomicUsize::new(0);

        load(&cache, "a", &calls).await.unwrap();
        load(&cache, "b", &calls).await.unwrap();
        // Touch "a" so "b" becomes the least recently used
        load(&cache, "a", &calls).await.unwrap();
        load(&cache, "c", &calls).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());

        let before = calls.load(Ordering::SeqCst);
        load(&cache, "b", &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), before + 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_purged_before_lru_eviction() {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = cache(2, clock.clone());

        cache.insert("old", "stale".to_string());
        clock.advance_secs(1800);
        cache.insert("fresh", "live".to_string());
        clock.advance_secs(1800);

        // "old" has expired; inserting purges it rather than evicting "fresh"
        cache.insert("new", "value".to_string());
        assert_eq!(cache.get("fresh").as_deref(), Some("live"));
        assert_eq!(cache.get("new").as_deref(), Some("value"));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_single_slot_cache_replaces_its_snapshot() {
        let cache = cache(1, Arc::new(ManualClock::at_epoch()));

        cache.insert("clients", "v1".to_string());
        cache.insert("clients", "v2".to_string());
        assert_eq!(cache.get("clients").as_deref(), Some("v2"));
        assert_eq!(cache.stats().evictions, 0);

        cache.insert("other", "x".to_string());
        assert!(cache.get("clients").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = cache(4, Arc::new(ManualClock::at_epoch()));
        cache.insert("a", "1".to_string());
        cache.insert("b", "2".to_string());

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
