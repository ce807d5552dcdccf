//! API Routes
//!
//! Configures the Axum router with all store server endpoints.

use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, get_handler, health_handler, keys_handler, set_handler, stats_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a key-value pair
/// - `GET /get/:key` - Retrieve a value by key
/// - `DELETE /del/:key` - Delete a key
/// - `GET /keys` - List every key
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router with all endpoints
    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/keys", get(keys_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCache;
    use crate::config::CacheConfig;
    use crate::store::JsonCodec;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let config = CacheConfig::new(300, 100);
        create_router(AppState::new(TtlCache::<Value, JsonCodec>::in_memory(&config)))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> StatusCode {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        app.clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_every_route_is_mounted() {
        let app = create_test_app();

        let set = json!({"key": "k", "value": {"n": 1}});
        assert_eq!(call(&app, "PUT", "/set", Some(set)).await, StatusCode::OK);
        assert_eq!(call(&app, "GET", "/get/k", None).await, StatusCode::OK);
        assert_eq!(call(&app, "GET", "/keys", None).await, StatusCode::OK);
        assert_eq!(call(&app, "GET", "/stats", None).await, StatusCode::OK);
        assert_eq!(call(&app, "GET", "/health", None).await, StatusCode::OK);
        assert_eq!(call(&app, "DELETE", "/del/k", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_key_routes_return_not_found() {
        let app = create_test_app();

        assert_eq!(call(&app, "GET", "/get/nope", None).await, StatusCode::NOT_FOUND);
        assert_eq!(call(&app, "DELETE", "/del/nope", None).await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method_is_rejected() {
        let app = create_test_app();

        assert_eq!(
            call(&app, "POST", "/set", Some(json!({"key": "k", "value": 1}))).await,
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(call(&app, "GET", "/del/k", None).await, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let app = create_test_app();
        assert_eq!(call(&app, "GET", "/flush", None).await, StatusCode::NOT_FOUND);
    }
}
