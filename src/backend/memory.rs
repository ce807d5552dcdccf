//! In-memory backend.
//!
//! Non-persistent byte storage; everything is lost when the owning store
//! is dropped.

use std::collections::HashMap;

use super::Backend;
use crate::error::{Result, StoreError};

/// `HashMap`-backed driver used by the `simple://` and `memory://` schemes.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn keys(&mut self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn len(&mut self) -> Result<usize> {
        Ok(self.entries.len())
    }

    fn contains(&mut self, key: &str) -> Result<bool> {
        Ok(self.entries.contains_key(key))
    }
}
