//! Cache Module
//!
//! TTL cache with lazy expiry and capacity-triggered culling, layered over
//! any store.

mod entry;
mod stats;
mod ttl;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use stats::CacheStats;
pub use ttl::TtlCache;
