//! TTL Cache Module
//!
//! Expiring cache layered over any [`Store`], with lazy expiry on read and
//! nearest-expiry-first culling on write.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::MemoryBackend;
use crate::cache::{current_timestamp_ms, CacheEntry, CacheStats};
use crate::config::CacheConfig;
use crate::error::{Result, StoreError};
use crate::store::{BincodeCodec, Codec, Mapping, Store};

// == TTL Cache ==
/// Cache whose entries expire `timeout` after they were written.
///
/// Expiry is enforced only when a key is read: an expired entry is deleted
/// and reported as `NotFound`, but it still shows up in [`keys`](Self::keys)
/// until something touches it. There is no background sweeper.
///
/// The cache holds no lock of its own. Wrap it in
/// [`Shared`](crate::store::Shared) to make each `get`/`set` (including the
/// expiry delete and cull-then-insert) atomic across threads.
pub struct TtlCache<V, C = BincodeCodec> {
    /// Underlying storage of `(expiry, value)` entries
    store: Store<CacheEntry<V>, C>,
    /// Lifetime of newly written entries
    timeout: Duration,
    /// Maximum number of entries held after any `set`
    max_entries: usize,
    /// Performance statistics
    stats: CacheStats,
}

impl<V, C> TtlCache<V, C>
where
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    // == Constructors ==
    /// Creates a cache over `store` using `config`.
    pub fn new(store: Store<CacheEntry<V>, C>, config: &CacheConfig) -> Self {
        Self::with_timeout(store, config.timeout_duration(), config.max_entries)
    }

    /// Creates a cache with a sub-second capable timeout.
    ///
    /// A `max_entries` of zero is raised to one.
    pub fn with_timeout(store: Store<CacheEntry<V>, C>, timeout: Duration, max_entries: usize) -> Self {
        Self {
            store,
            timeout,
            max_entries: max_entries.max(1),
            stats: CacheStats::new(),
        }
    }

    /// Opens a cache on the store addressed by `url`.
    pub fn open(url: &str, config: &CacheConfig) -> Result<Self>
    where
        C: Default,
    {
        Ok(Self::new(Store::open(url)?, config))
    }

    /// Creates a cache kept entirely in process memory.
    pub fn in_memory(config: &CacheConfig) -> Self
    where
        C: Default,
    {
        Self::new(Store::new(MemoryBackend::new()), config)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    // == Get ==
    /// Returns the cached value if present and not expired.
    ///
    /// An expired entry is deleted before `NotFound` is returned.
    pub fn get(&mut self, key: &str) -> Result<V> {
        let entry = match self.store.get(key) {
            Ok(entry) => entry,
            Err(e) => {
                if e.is_not_found() {
                    self.stats.record_miss();
                }
                return Err(e);
            }
        };

        if entry.is_expired_at(current_timestamp_ms()) {
            match self.store.delete(key) {
                Ok(()) | Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
            self.stats.record_expiration();
            self.stats.record_miss();
            debug!(key = %key, "Expired entry removed on read");
            return Err(StoreError::NotFound(key.to_string()));
        }

        self.stats.record_hit();
        Ok(entry.value)
    }

    // == Set ==
    /// Stores `value` with a fresh expiry.
    ///
    /// Writing a new key while the cache holds `max_entries` entries culls
    /// first, so the entry count never exceeds `max_entries`. Overwriting an
    /// existing key never culls.
    pub fn set(&mut self, key: &str, value: V) -> Result<()> {
        if !self.store.contains_key(key)? && self.store.len()? >= self.max_entries {
            self.cull()?;
        }

        let entry = CacheEntry::new(value, self.timeout);
        self.store.set(key, &entry)
    }

    // == Delete ==
    /// Removes `key`.
    ///
    /// An expired entry counts as absent: it is removed, but the call
    /// reports `NotFound` just like `get` would.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let expired = match self.store.get(key) {
            Ok(entry) => entry.is_expired_at(current_timestamp_ms()),
            Err(StoreError::NotFound(_)) => return Err(StoreError::NotFound(key.to_string())),
            // Undecodable payloads are still removable.
            Err(_) => false,
        };

        self.store.delete(key)?;
        if expired {
            self.stats.record_expiration();
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(())
    }

    /// Lists every key, including expired entries not yet touched.
    pub fn keys(&mut self) -> Result<Vec<String>> {
        self.store.keys()
    }

    pub fn len(&mut self) -> Result<usize> {
        self.store.len()
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    // == Cull ==
    /// Removes just enough entries to leave room for one insert.
    ///
    /// Entries go in order of `(expires_at, key)`, so expired entries are
    /// taken first and ties are broken by key. Entries whose payload cannot
    /// be decoded are treated as already expired. Returns how many entries
    /// were removed.
    pub fn cull(&mut self) -> Result<usize> {
        let target = self.max_entries - 1;
        let len = self.store.len()?;
        if len <= target {
            return Ok(0);
        }

        let mut ranked = Vec::with_capacity(len);
        for key in self.store.keys()? {
            match self.store.get(&key) {
                Ok(entry) => ranked.push((entry.expires_at, key)),
                Err(StoreError::NotFound(_)) => continue,
                Err(_) => ranked.push((i64::MIN, key)),
            }
        }
        ranked.sort();

        // Listed keys that cannot be fetched still count toward `len`, so
        // the excess comes from `len` and the removable entries cover it.
        let excess = len - target;
        let mut removed = 0;
        for (_, key) in ranked.into_iter().take(excess) {
            match self.store.delete(&key) {
                Ok(()) => removed += 1,
                Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        if removed < excess {
            warn!(removed, excess, "Cull could not free enough entries");
        }

        self.stats.record_evictions(removed);
        debug!(removed, max_entries = self.max_entries, "Culled cache entries");
        Ok(removed)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&mut self) -> CacheStats {
        let mut stats = self.stats.clone();
        if let Ok(len) = self.store.len() {
            stats.set_total_entries(len);
        }
        stats
    }

    /// Flushes and releases the underlying store.
    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}

impl<V, C> Mapping<V> for TtlCache<V, C>
where
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    fn get(&mut self, key: &str) -> Result<V> {
        TtlCache::get(self, key)
    }

    fn set(&mut self, key: &str, value: V) -> Result<()> {
        TtlCache::set(self, key, value)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        TtlCache::delete(self, key)
    }

    fn keys(&mut self) -> Result<Vec<String>> {
        TtlCache::keys(self)
    }

    fn len(&mut self) -> Result<usize> {
        TtlCache::len(self)
    }

    fn stats(&mut self) -> Option<CacheStats> {
        Some(TtlCache::stats(self))
    }

    fn flush(&mut self) -> Result<()> {
        self.store.sync()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::store::JsonCodec;
    use std::collections::HashSet;
    use std::thread::sleep;
    use tempfile::TempDir;

    fn cache(max_entries: usize, timeout: Duration) -> TtlCache<i32> {
        TtlCache::with_timeout(Store::new(MemoryBackend::new()), timeout, max_entries)
    }

    #[test]
    fn test_cache_set_and_get() {
        let mut cache = cache(10, Duration::from_secs(300));

        cache.set("a", 1).unwrap();
        assert_eq!(cache.get("a").unwrap(), 1);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_cache_get_nonexistent() {
        let mut cache = cache(10, Duration::from_secs(300));
        assert!(matches!(cache.get("nope"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_cache_lazy_expiry_removes_entry() {
        let mut cache = cache(10, Duration::from_millis(50));
        cache.set("short", 1).unwrap();
        assert!(cache.get("short").is_ok());

        sleep(Duration::from_millis(80));

        // Still physically present until touched.
        assert_eq!(cache.keys().unwrap(), vec!["short"]);
        assert_eq!(cache.len().unwrap(), 1);

        assert!(matches!(cache.get("short"), Err(StoreError::NotFound(_))));
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn test_cache_capacity_scenario() {
        let mut cache = cache(2, Duration::from_secs(100));
        cache.set("a", 1).unwrap();
        cache.set("b", 2).unwrap();
        cache.set("c", 3).unwrap();

        assert_eq!(cache.len().unwrap(), 2);

        let found: Vec<&str> = ["a", "b", "c"]
            .into_iter()
            .filter(|k| cache.get(k).is_ok())
            .collect();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&"c"), "the newest entry is always kept");
    }

    #[test]
    fn test_cull_takes_nearest_expiry_first() {
        let mut store: Store<CacheEntry<i32>> = Store::new(MemoryBackend::new());
        let now = current_timestamp_ms();
        for (key, offset) in [("late", 90_000), ("soon", 1_000), ("stale", -5_000), ("mid", 50_000)] {
            store
                .set(
                    key,
                    &CacheEntry {
                        expires_at: now + offset,
                        value: 0,
                    },
                )
                .unwrap();
        }
        let mut cache = TtlCache::with_timeout(store, Duration::from_secs(100), 3);

        assert_eq!(cache.cull().unwrap(), 2);

        let remaining: HashSet<String> = cache.keys().unwrap().into_iter().collect();
        assert_eq!(
            remaining,
            HashSet::from(["late".to_string(), "mid".to_string()])
        );
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn test_cull_noop_below_capacity() {
        let mut cache = cache(5, Duration::from_secs(100));
        cache.set("a", 1).unwrap();
        assert_eq!(cache.cull().unwrap(), 0);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_cull_treats_undecodable_payload_as_expired() {
        let mut backend = MemoryBackend::new();
        backend.set("junk", b"not an entry".to_vec()).unwrap();
        let store: Store<CacheEntry<i32>, JsonCodec> = Store::new(backend);
        let mut cache = TtlCache::with_timeout(store, Duration::from_secs(100), 2);

        cache.set("good", 1).unwrap();
        cache.set("newer", 2).unwrap();

        assert!(matches!(cache.get("junk"), Err(StoreError::NotFound(_))));
        assert_eq!(cache.get("good").unwrap(), 1);
        assert_eq!(cache.get("newer").unwrap(), 2);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_cull() {
        let mut cache = cache(2, Duration::from_secs(100));
        cache.set("a", 1).unwrap();
        cache.set("b", 2).unwrap();
        cache.set("a", 10).unwrap();

        assert_eq!(cache.get("a").unwrap(), 10);
        assert_eq!(cache.get("b").unwrap(), 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut cache = cache(0, Duration::from_secs(100));
        cache.set("a", 1).unwrap();
        cache.set("b", 2).unwrap();

        assert_eq!(cache.max_entries(), 1);
        assert_eq!(cache.keys().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_cache_delete() {
        let mut cache = cache(10, Duration::from_secs(100));
        cache.set("a", 1).unwrap();

        cache.delete("a").unwrap();
        assert!(matches!(cache.get("a"), Err(StoreError::NotFound(_))));
        assert!(matches!(cache.delete("a"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_delete_expired_entry_is_not_found() {
        let mut cache = cache(10, Duration::from_millis(50));
        cache.set("stale", 1).unwrap();
        cache.set("live", 2).unwrap();
        sleep(Duration::from_millis(80));
        cache.set("live", 2).unwrap();

        assert!(matches!(cache.delete("stale"), Err(StoreError::NotFound(_))));
        assert_eq!(cache.keys().unwrap(), vec!["live"]);
        assert_eq!(cache.stats().expirations, 1);

        cache.delete("live").unwrap();
        assert!(matches!(cache.delete("live"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_cache_stats() {
        let mut cache = cache(10, Duration::from_millis(30));
        cache.set("a", 1).unwrap();
        cache.get("a").unwrap();
        let _ = cache.get("missing");
        sleep(Duration::from_millis(60));
        let _ = cache.get("a");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_cache_from_config() {
        let cache: TtlCache<String> = TtlCache::in_memory(&CacheConfig::new(100, 2));
        assert_eq!(cache.timeout(), Duration::from_secs(100));
        assert_eq!(cache.max_entries(), 2);
    }

    #[test]
    fn test_cache_over_dbm_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let url = format!("dbm://{}", temp.path().join("cache.db").display());
        let config = CacheConfig::new(100, 10);

        let mut cache: TtlCache<String> = TtlCache::open(&url, &config).unwrap();
        cache.set("x", "y".to_string()).unwrap();
        cache.close().unwrap();

        let mut reopened: TtlCache<String> = TtlCache::open(&url, &config).unwrap();
        assert_eq!(reopened.get("x").unwrap(), "y");
    }
}
