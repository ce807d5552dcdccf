//! Single-file table backend.
//!
//! The whole table lives in memory after open; writes are buffered until
//! [`Backend::sync`] rewrites the file. Stores opened on `dbm://` and
//! `bsd://` wrap this driver in [`Committing`](super::Committing) so every
//! mutation is flushed immediately.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::Backend;
use crate::error::{Result, StoreError};

/// Buffered single-file driver.
#[derive(Debug)]
pub struct DbmBackend {
    path: PathBuf,
    table: BTreeMap<String, Vec<u8>>,
    dirty: bool,
}

impl DbmBackend {
    /// Opens the table at `path`, creating an empty one if it does not exist.
    ///
    /// # Errors
    /// Returns [`StoreError::BackendUnavailable`] if the file cannot be read,
    /// is not a valid table, or cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            let bytes = fs::read(&path).map_err(|e| unavailable(&path, e))?;
            let table = bincode::deserialize(&bytes).map_err(|e| unavailable(&path, e))?;
            debug!(path = %path.display(), "Opened existing dbm table");
            return Ok(Self {
                path,
                table,
                dirty: false,
            });
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| unavailable(&path, e))?;
        }

        let mut backend = Self {
            path,
            table: BTreeMap::new(),
            dirty: true,
        };
        backend
            .sync()
            .map_err(|e| unavailable(&backend.path, e))?;
        debug!(path = %backend.path.display(), "Created dbm table");
        Ok(backend)
    }

    /// Path of the table file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if writes are waiting for a sync.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn write_table(&self) -> Result<()> {
        let bytes =
            bincode::serialize(&self.table).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn unavailable(path: &Path, err: impl std::fmt::Display) -> StoreError {
    StoreError::BackendUnavailable(format!("cannot open table {}: {}", path.display(), err))
}

impl Backend for DbmBackend {
    fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        self.table
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.table.insert(key.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.table
            .remove(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        self.dirty = true;
        Ok(())
    }

    fn keys(&mut self) -> Result<Vec<String>> {
        Ok(self.table.keys().cloned().collect())
    }

    fn len(&mut self) -> Result<usize> {
        Ok(self.table.len())
    }

    fn contains(&mut self, key: &str) -> Result<bool> {
        Ok(self.table.contains_key(key))
    }

    fn sync(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.write_table()?;
        self.dirty = false;
        Ok(())
    }
}

impl Drop for DbmBackend {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            warn!(path = %self.path.display(), error = %e, "Final dbm sync failed");
        }
    }
}
