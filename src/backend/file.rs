//! Filesystem directory backend.
//!
//! Every key is one file inside the store directory. Keys are
//! percent-encoded into file names so arbitrary strings (including `/`)
//! never escape the directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use url::form_urlencoded;

use super::Backend;
use crate::error::{Result, StoreError};

/// Longest file name accepted by common filesystems (ext4, APFS, NTFS), in bytes
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Directory-backed driver used by the `file://` scheme.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Opens the store directory, creating it if needed.
    ///
    /// # Errors
    /// Returns [`StoreError::BackendUnavailable`] if the directory cannot be
    /// created or the path exists but is not a directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        fs::create_dir_all(&dir).map_err(|e| {
            StoreError::BackendUnavailable(format!(
                "cannot create store directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        debug!(dir = %dir.display(), "Opened file backend");
        Ok(Self { dir })
    }

    /// Directory holding the key files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let name: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
        if name.is_empty() || name == "." || name == ".." || name.len() > MAX_FILE_NAME_LEN {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(name))
    }
}

fn decode_name(name: &str) -> Option<String> {
    form_urlencoded::parse(name.as_bytes())
        .next()
        .filter(|(_, rest)| rest.is_empty())
        .map(|(key, _)| key.into_owned())
}

impl Backend for FileBackend {
    fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        let path = self
            .path_for(key)
            .map_err(|_| StoreError::NotFound(key.to_string()))?;
        fs::read(path).map_err(|_| StoreError::NotFound(key.to_string()))
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        fs::write(path, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let path = self
            .path_for(key)
            .map_err(|_| StoreError::NotFound(key.to_string()))?;
        fs::remove_file(path).map_err(|_| StoreError::NotFound(key.to_string()))
    }

    fn keys(&mut self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(key) = entry.file_name().to_str().and_then(decode_name) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn contains(&mut self, key: &str) -> Result<bool> {
        Ok(self.path_for(key).map(|p| p.is_file()).unwrap_or(false))
    }
}
