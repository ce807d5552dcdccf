//! Error types for stores, caches and the HTTP surface
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error Enum ==
/// Unified error type for every store, backend and cache operation.
///
/// Backends normalize fetch and remove failures to [`StoreError::NotFound`],
/// so callers of `get`/`delete` only ever see one failure shape for a
/// missing or unreachable key.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Key absent, unreadable, or lazily expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Storage medium could not be opened or reached
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Payload could not be encoded or decoded
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Pseudo-URL is malformed or names an unknown scheme
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    /// Key cannot be represented by the backend
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Write-path I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns true for the absent-key failure shape.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::InvalidKey(_)
            | StoreError::InvalidUrl(_)
            | StoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            StoreError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Serialization(_) | StoreError::Io(_) | StoreError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
