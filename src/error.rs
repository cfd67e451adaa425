//! Error types for the admission and caching layer
//!
//! Provides unified error handling using thiserror.
//!
//! Store faults never cross a component boundary: the rate limiter fails
//! open and the cache service fails as a miss. Only input-contract
//! violations (`CacheError`) reach callers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Store Error Enum ==
/// Failure talking to the shared key-value store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection refused, dropped, or the operation timed out
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered, but with something we cannot use
    /// (e.g. INCR on a non-integer value)
    #[error("Malformed store reply: {0}")]
    Malformed(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Malformed(err.to_string())
        }
    }
}

// == Cache Error Enum ==
/// Programmer errors surfaced synchronously by the cache service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Empty, oversized or otherwise unusable key / batch argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// == API Error Enum ==
/// Errors returned by the HTTP surface.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidInput(msg) => ApiError::InvalidRequest(msg),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Aliases ==
/// Result of a raw store operation.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result of a cache service operation.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Result of an HTTP handler.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
