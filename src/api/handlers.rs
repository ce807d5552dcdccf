//! API Handlers
//!
//! HTTP request handlers for each store server endpoint.
//!
//! Store operations block (file, table and FTP backends do real I/O), so
//! every handler runs its operation on the blocking thread pool.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, KeysResponse, SetRequest, SetResponse,
    StatsResponse,
};
use crate::store::{JsonCodec, Mapping, Shared, Store};

/// Type-erased mapping served over HTTP: a plain store or a TTL cache.
pub type DynMapping = Box<dyn Mapping<Value> + Send>;

/// Application state shared across all handlers.
///
/// Holds one mapping behind the coarse store lock.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe store or cache
    pub store: Arc<Shared<DynMapping>>,
}

impl AppState {
    /// Creates a new AppState serving the given mapping.
    pub fn new(mapping: impl Mapping<Value> + Send + 'static) -> Self {
        let boxed: DynMapping = Box::new(mapping);
        Self {
            store: Arc::new(Shared::new(boxed)),
        }
    }

    /// Opens the configured store, fronted by a TTL cache if enabled.
    ///
    /// Values are kept as JSON so any request payload round-trips.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.cache_enabled {
            let cache: TtlCache<Value, JsonCodec> =
                TtlCache::open(&config.store_url, &config.cache_config())?;
            Ok(Self::new(cache))
        } else {
            let store: Store<Value, JsonCodec> = Store::open(&config.store_url)?;
            Ok(Self::new(store))
        }
    }

    /// Runs a store operation on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Shared<DynMapping>) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| StoreError::Internal(format!("Task join error: {}", e)))?
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value under a key.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(StoreError::InvalidRequest(error_msg));
    }

    let key = req.key.clone();
    state
        .run(move |store| store.set(&req.key, req.value))
        .await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value by key.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let lookup = key.clone();
    let value = state.run(move |store| store.get::<Value>(&lookup)).await?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
///
/// Deletes a key.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let target = key.clone();
    state
        .run(move |store| store.delete::<Value>(&target))
        .await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /keys
///
/// Lists every key, including cached entries that expired but were not read.
pub async fn keys_handler(State(state): State<AppState>) -> Result<Json<KeysResponse>> {
    let keys = state.run(|store| store.keys::<Value>()).await?;
    Ok(Json(KeysResponse::new(keys)))
}

/// Handler for GET /stats
///
/// Returns cache statistics, or just the entry count for a plain store.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let response = state
        .run(|store| {
            let mut guard = store.lock();
            let mapping: &mut dyn Mapping<Value> = &mut **guard;
            match mapping.stats() {
                Some(stats) => Ok(StatsResponse::from_stats(&stats)),
                None => Ok(StatsResponse::uncached(mapping.len()?)),
            }
        })
        .await?;

    Ok(Json(response))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::config::CacheConfig;
    use serde_json::json;

    fn cached_state() -> AppState {
        AppState::new(TtlCache::<Value, JsonCodec>::in_memory(&CacheConfig::new(300, 100)))
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = cached_state();

        let req = SetRequest {
            key: "test_key".to_string(),
            value: json!({"answer": 42}),
        };
        let result = set_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        let result = get_handler(State(state.clone()), Path("test_key".to_string())).await;
        let response = result.unwrap();
        assert_eq!(response.value, json!({"answer": 42}));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = cached_state();

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = cached_state();

        let req = SetRequest {
            key: "to_delete".to_string(),
            value: json!("value"),
        };
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());

        let result = get_handler(State(state), Path("to_delete".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_keys_handler() {
        let state = cached_state();
        for key in ["b", "a"] {
            let req = SetRequest {
                key: key.to_string(),
                value: json!(null),
            };
            set_handler(State(state.clone()), Json(req)).await.unwrap();
        }

        let response = keys_handler(State(state)).await.unwrap();
        assert_eq!(response.keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_stats_handler_cached() {
        let state = cached_state();

        let response = stats_handler(State(state)).await.unwrap();
        assert!(response.cached);
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
    }

    #[tokio::test]
    async fn test_stats_handler_plain_store() {
        let store: Store<Value, JsonCodec> = Store::new(MemoryBackend::new());
        let state = AppState::new(store);

        let response = stats_handler(State(state)).await.unwrap();
        assert!(!response.cached);
        assert_eq!(response.total_entries, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = cached_state();

        let req = SetRequest {
            key: "".to_string(),
            value: json!("value"),
        };
        let result = set_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(StoreError::InvalidRequest(_))));
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = Config {
            store_url: "bogus".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            AppState::from_config(&config),
            Err(StoreError::InvalidUrl(_))
        ));
    }
}
