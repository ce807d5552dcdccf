//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

// == Cache Config ==
/// Settings recognized when building a TTL cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Seconds until newly written entries expire
    pub timeout: u64,
    /// Entry count at which writes of new keys trigger culling
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn new(timeout: u64, max_entries: usize) -> Self {
        Self {
            timeout,
            max_entries,
        }
    }

    /// Entry lifetime as a `Duration`.
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            timeout: 300,
            max_entries: 1000,
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pseudo-URL of the backing store
    pub store_url: String,
    /// Whether a TTL cache sits in front of the store
    pub cache_enabled: bool,
    /// Seconds until cached entries expire
    pub cache_timeout: u64,
    /// Maximum number of cached entries
    pub cache_max_entries: usize,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STORE_URL` - Store pseudo-URL (default: `memory://`)
    /// - `CACHE_ENABLED` - Put a TTL cache in front of the store (default: true)
    /// - `CACHE_TIMEOUT` - Entry lifetime in seconds (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            store_url: env::var("STORE_URL").unwrap_or(defaults.store_url),
            cache_enabled: env::var("CACHE_ENABLED")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.cache_enabled),
            cache_timeout: env::var("CACHE_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_timeout),
            cache_max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_entries),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        }
    }

    /// Cache settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.cache_timeout, self.cache_max_entries)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        let cache = CacheConfig::default();
        Self {
            store_url: "memory://".to_string(),
            cache_enabled: true,
            cache_timeout: cache.timeout,
            cache_max_entries: cache.max_entries,
            server_port: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.store_url, "memory://");
        assert!(config.cache_enabled);
        assert_eq!(config.cache_timeout, 300);
        assert_eq!(config.cache_max_entries, 1000);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("STORE_URL");
        env::remove_var("CACHE_ENABLED");
        env::remove_var("CACHE_TIMEOUT");
        env::remove_var("CACHE_MAX_ENTRIES");
        env::remove_var("SERVER_PORT");

        let config = Config::from_env();
        assert_eq!(config.store_url, "memory://");
        assert!(config.cache_enabled);
        assert_eq!(config.cache_config(), CacheConfig::default());
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_cache_config_timeout_duration() {
        let config = CacheConfig::new(100, 2);
        assert_eq!(config.timeout_duration(), Duration::from_secs(100));
    }
}
