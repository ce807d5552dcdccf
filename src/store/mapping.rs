//! The mapping contract shared by stores and caches.

use crate::cache::CacheStats;
use crate::error::Result;

/// Associative-container operations exposed identically by
/// [`Store`](super::Store) and [`TtlCache`](crate::cache::TtlCache), so
/// callers cannot tell a cache from a store.
pub trait Mapping<V> {
    /// Returns the value under `key`, or `NotFound`.
    fn get(&mut self, key: &str) -> Result<V>;

    /// Creates or overwrites `key`.
    fn set(&mut self, key: &str, value: V) -> Result<()>;

    /// Removes `key`, or fails with `NotFound`.
    fn delete(&mut self, key: &str) -> Result<()>;

    /// Lists every key, in no particular order.
    fn keys(&mut self) -> Result<Vec<String>>;

    /// Number of stored keys.
    fn len(&mut self) -> Result<usize>;

    /// Hit/miss statistics, for mappings that track them.
    fn stats(&mut self) -> Option<CacheStats> {
        None
    }

    /// Flushes any buffered writes to the medium.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<V, M: Mapping<V> + ?Sized> Mapping<V> for Box<M> {
    fn get(&mut self, key: &str) -> Result<V> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: V) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn keys(&mut self) -> Result<Vec<String>> {
        (**self).keys()
    }

    fn len(&mut self) -> Result<usize> {
        (**self).len()
    }

    fn stats(&mut self) -> Option<CacheStats> {
        (**self).stats()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
