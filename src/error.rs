//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its HTTP host.
///
/// Only `InvalidRequest` and `CapacityExceeded` ever reach the caller of
/// `CacheManager::set`. The durable variants are absorbed by the manager,
/// logged and counted in `CacheStats::durable_errors`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid request data or configuration
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A single value is larger than the whole cache
    #[error("Value for key '{key}' needs {size_bytes} bytes but capacity is {capacity_bytes} bytes")]
    CapacityExceeded {
        key: String,
        size_bytes: u64,
        capacity_bytes: u64,
    },

    /// The durable medium rejected a write
    #[error("Durable write failed for '{key}': {reason}")]
    DurablePersistFailed { key: String, reason: String },

    /// The durable medium could not be read
    #[error("Durable read failed for '{key}': {reason}")]
    DurableReadFailed { key: String, reason: String },

    /// A durable record could not be decoded
    #[error("Corrupt durable record under '{key}': {reason}")]
    CorruptDurableRecord { key: String, reason: String },

    /// The version gate could not confirm a wipe of stale records
    #[error("Version wipe failed ({previous:?} -> {current}): {reason}")]
    VersionMismatchWipeFailed {
        previous: Option<String>,
        current: String,
        reason: String,
    },

    /// Key not found in cache (HTTP host only)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Durable Error Enum ==
/// Errors raised by a `DurableTier` implementation.
#[derive(Error, Debug)]
pub enum DurableError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The medium refused the operation (quota, offline, injected failure)
    #[error("Durable medium unavailable: {0}")]
    Unavailable(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::CapacityExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::DurablePersistFailed { .. }
            | CacheError::DurableReadFailed { .. }
            | CacheError::CorruptDurableRecord { .. }
            | CacheError::VersionMismatchWipeFailed { .. }
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Result type returned by durable tier adapters.
pub type DurableResult<T> = std::result::Result<T, DurableError>;
