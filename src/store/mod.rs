//! Store Module
//!
//! Typed mapping over a byte-level [`Backend`], with the codec applied on
//! the way in and out.
//!
//! Write policies are layered rather than built in:
//! - commit-after-write comes from wrapping the backend in [`Committing`]
//! - thread safety comes from wrapping the store in [`Shared`]

mod codec;
mod mapping;
mod shared;

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::backend::{Backend, Committing, DbmBackend, FileBackend, FtpBackend, MemoryBackend};
use crate::engine::Engine;
use crate::error::{Result, StoreError};

pub use codec::{BincodeCodec, Codec, JsonCodec};
pub use mapping::Mapping;
pub use shared::{Shared, SharedStore};

// == Backend Factory ==
/// Opens the driver described by `engine`.
///
/// Table-file engines are wrapped in [`Committing`] so every mutation is
/// flushed before the call returns.
pub fn open_backend(engine: &Engine) -> Result<Box<dyn Backend>> {
    let backend: Box<dyn Backend> = match engine {
        Engine::Simple | Engine::Memory => Box::new(MemoryBackend::new()),
        Engine::File { path } => Box::new(FileBackend::open(path)?),
        Engine::Dbm { path } => Box::new(Committing::new(DbmBackend::open(path)?)),
        Engine::Ftp(target) => Box::new(FtpBackend::connect(target)?),
    };
    Ok(backend)
}

// == Store ==
/// Typed key-value store owning exactly one backend and one codec.
pub struct Store<V, C = BincodeCodec> {
    backend: Box<dyn Backend>,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V, C> Store<V, C>
where
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    // == Constructors ==
    /// Creates a store over `backend` with the default codec.
    pub fn new(backend: impl Backend + 'static) -> Self
    where
        C: Default,
    {
        Self::with_codec(Box::new(backend), C::default())
    }

    /// Creates a store over an already boxed backend with an explicit codec.
    pub fn with_codec(backend: Box<dyn Backend>, codec: C) -> Self {
        Self {
            backend,
            codec,
            _value: PhantomData,
        }
    }

    /// Opens the store addressed by a pseudo-URL such as `dbm:///var/stash.db`.
    ///
    /// The returned store takes `&mut self` and is not synchronized, even
    /// for `memory://`. Use [`Shared::open`] to get the thread-safe store
    /// that concurrent callers need.
    ///
    /// # Errors
    /// - [`StoreError::InvalidUrl`] for malformed URLs or unknown schemes
    /// - [`StoreError::BackendUnavailable`] if the medium cannot be opened
    pub fn open(url: &str) -> Result<Self>
    where
        C: Default,
    {
        let engine = Engine::parse(url)?;
        let backend = open_backend(&engine)?;
        info!(engine = engine.name(), "Store opened");
        Ok(Self::with_codec(backend, C::default()))
    }

    // == Get ==
    /// Fetches and decodes the value under `key`.
    pub fn get(&mut self, key: &str) -> Result<V> {
        let bytes = self.backend.get(key)?;
        self.codec.decode(&bytes)
    }

    // == Set ==
    /// Encodes `value` and stores it under `key`.
    pub fn set(&mut self, key: &str, value: &V) -> Result<()> {
        let bytes = self.codec.encode(value)?;
        self.backend.set(key, bytes)
    }

    // == Delete ==
    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.backend.delete(key)
    }

    pub fn keys(&mut self) -> Result<Vec<String>> {
        self.backend.keys()
    }

    pub fn len(&mut self) -> Result<usize> {
        self.backend.len()
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains_key(&mut self, key: &str) -> Result<bool> {
        self.backend.contains(key)
    }

    // == Items ==
    /// Collects every `(key, value)` pair.
    ///
    /// Keys that disappear between listing and fetching are skipped.
    pub fn items(&mut self) -> Result<Vec<(String, V)>> {
        let mut items = Vec::new();
        for key in self.keys()? {
            match self.get(&key) {
                Ok(value) => items.push((key, value)),
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(items)
    }

    /// Flushes buffered backend writes.
    pub fn sync(&mut self) -> Result<()> {
        self.backend.sync()
    }

    /// Flushes and releases the backend.
    pub fn close(mut self) -> Result<()> {
        self.sync()?;
        info!("Store closed");
        Ok(())
    }
}

impl<V, C> fmt::Debug for Store<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl<V, C> Mapping<V> for Store<V, C>
where
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    fn get(&mut self, key: &str) -> Result<V> {
        Store::get(self, key)
    }

    fn set(&mut self, key: &str, value: V) -> Result<()> {
        Store::set(self, key, &value)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        Store::delete(self, key)
    }

    fn keys(&mut self) -> Result<Vec<String>> {
        Store::keys(self)
    }

    fn len(&mut self) -> Result<usize> {
        Store::len(self)
    }

    fn flush(&mut self) -> Result<()> {
        self.sync()
    }
}
