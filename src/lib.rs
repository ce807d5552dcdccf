//! kvstash - one mapping interface over many storage backends
//!
//! Stores are opened from a pseudo-URL (`memory://`, `file://dir`,
//! `dbm://path`, `ftp://host/dir`) and behave like a key-value map whose
//! values are serialized on the way in and out. A TTL cache with bounded
//! size can sit in front of any of them.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;

pub use api::{create_router, AppState};
pub use cache::{CacheStats, TtlCache};
pub use config::{CacheConfig, Config};
pub use engine::Engine;
pub use error::{Result, StoreError};
pub use store::{Mapping, Shared, SharedStore, Store};
