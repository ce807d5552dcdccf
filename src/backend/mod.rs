//! Backend Module
//!
//! Byte-level storage drivers behind a single capability trait.
//!
//! # Variants
//! - [`MemoryBackend`] - `HashMap` in process memory
//! - [`FileBackend`] - one file per key in a directory
//! - [`DbmBackend`] - single-file table with buffered writes
//! - [`FtpBackend`] - one remote file per key on an FTP server

mod dbm;
mod file;
mod ftp;
mod ftp_client;
mod memory;

use tracing::warn;

use crate::error::Result;

pub use dbm::DbmBackend;
pub use file::FileBackend;
pub use ftp::{parse_listing, FtpBackend, FtpSession};
pub use ftp_client::FtpClient;
pub use memory::MemoryBackend;

// == Backend Trait ==
/// Primitive capability set every storage driver provides.
///
/// `get` and `delete` report any failure to reach the key as
/// [`StoreError::NotFound`](crate::error::StoreError::NotFound).
pub trait Backend: Send {
    /// Fetches the raw payload stored under `key`.
    fn get(&mut self, key: &str) -> Result<Vec<u8>>;

    /// Creates or overwrites `key`.
    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Removes `key`.
    fn delete(&mut self, key: &str) -> Result<()>;

    /// Lists every key, in no particular order.
    fn keys(&mut self) -> Result<Vec<String>>;

    /// Number of stored keys.
    fn len(&mut self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    /// Returns true if `key` is present.
    fn contains(&mut self, key: &str) -> Result<bool> {
        Ok(self.keys()?.iter().any(|k| k == key))
    }

    /// Flushes buffered writes to the medium.
    ///
    /// Backends without a durability step keep this default no-op.
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
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

    fn contains(&mut self, key: &str) -> Result<bool> {
        (**self).contains(key)
    }

    fn sync(&mut self) -> Result<()> {
        (**self).sync()
    }
}

// == Committing Decorator ==
/// Calls `sync` on the wrapped backend after every `set` and `delete`.
///
/// A failing sync is logged and swallowed: the write itself already
/// succeeded, and callers cannot tell a missing durability step from one
/// that ran.
#[derive(Debug)]
pub struct Committing<B> {
    inner: B,
}

impl<B: Backend> Committing<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> B {
        self.inner
    }

    fn commit(&mut self) {
        if let Err(e) = self.inner.sync() {
            warn!(error = %e, "Commit after write failed");
        }
    }
}

impl<B: Backend> Backend for Committing<B> {
    fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.inner.set(key, value)?;
        self.commit();
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.inner.delete(key)?;
        self.commit();
        Ok(())
    }

    fn keys(&mut self) -> Result<Vec<String>> {
        self.inner.keys()
    }

    fn len(&mut self) -> Result<usize> {
        self.inner.len()
    }

    fn contains(&mut self, key: &str) -> Result<bool> {
        self.inner.contains(key)
    }

    fn sync(&mut self) -> Result<()> {
        self.inner.sync()
    }
}
