//! Coarse-lock wrapper for mappings shared across threads.

use parking_lot::{Mutex, MutexGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Codec, Mapping, Store};
use crate::cache::CacheStats;
use crate::error::Result;

/// Any [`Mapping`] behind one store-wide mutex.
///
/// Every operation holds the lock for its whole body, so compound
/// operations inside the wrapped mapping (a cache deleting an expired entry
/// during `get`, or culling before an insert) are atomic with respect to
/// other callers. There are no per-key locks.
///
/// `get` hands back a freshly decoded, owned value: mutating it never
/// reaches the stored original.
#[derive(Debug, Default)]
pub struct Shared<M> {
    inner: Mutex<M>,
}

/// Thread-safe typed store.
pub type SharedStore<V, C = super::BincodeCodec> = Shared<Store<V, C>>;

impl<M> Shared<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Holds the lock across several operations.
    pub fn lock(&self) -> MutexGuard<'_, M> {
        self.inner.lock()
    }

    pub fn into_inner(self) -> M {
        self.inner.into_inner()
    }

    pub fn get<V>(&self, key: &str) -> Result<V>
    where
        M: Mapping<V>,
    {
        self.inner.lock().get(key)
    }

    pub fn set<V>(&self, key: &str, value: V) -> Result<()>
    where
        M: Mapping<V>,
    {
        self.inner.lock().set(key, value)
    }

    pub fn delete<V>(&self, key: &str) -> Result<()>
    where
        M: Mapping<V>,
    {
        self.inner.lock().delete(key)
    }

    pub fn keys<V>(&self) -> Result<Vec<String>>
    where
        M: Mapping<V>,
    {
        self.inner.lock().keys()
    }

    pub fn len<V>(&self) -> Result<usize>
    where
        M: Mapping<V>,
    {
        self.inner.lock().len()
    }

    pub fn stats<V>(&self) -> Option<CacheStats>
    where
        M: Mapping<V>,
    {
        self.inner.lock().stats()
    }

    pub fn flush<V>(&self) -> Result<()>
    where
        M: Mapping<V>,
    {
        self.inner.lock().flush()
    }
}

impl<V, C> Shared<Store<V, C>>
where
    V: Serialize + DeserializeOwned,
    C: Codec + Default,
{
    /// Opens a thread-safe store from a pseudo-URL.
    ///
    /// This is the constructor for the shared in-memory store: every
    /// `memory://` handle meant for more than one thread comes from here.
    pub fn open(url: &str) -> Result<Self> {
        Store::open(url).map(Self::new)
    }
}
