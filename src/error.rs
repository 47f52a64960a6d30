//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror. `StoreError` lives below
//! the operation guard and never reaches facade callers; `ApiError` is the
//! admin HTTP surface's error.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error Enum ==
/// Failure of a single call against the key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error reported by the Redis client
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The underlying connection dropped; the handle must be discarded
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Stored value has the wrong shape for the command (e.g. INCR on text)
    #[error("Invalid value at {0}")]
    InvalidValue(String),
}

impl StoreError {
    /// Returns true when the connection carrying this call is no longer usable.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            StoreError::ConnectionLost(_) => true,
            StoreError::Redis(e) => e.is_connection_dropped() || e.is_io_error(),
            _ => false,
        }
    }
}

// == Api Error Enum ==
/// Error type for the admin HTTP endpoints.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Cache tier unavailable or the operation did not complete in budget
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Caller exceeded its fixed-window quota
    #[error("Rate limit exceeded, retry in {retry_after}s")]
    RateLimited { retry_after: u64 },
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.to_string()));

        match self {
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, body).into_response(),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, body).into_response(),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.to_string())],
                body,
            )
                .into_response(),
        }
    }
}

// == Result Type Aliases ==
/// Result of a raw store call.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Convenience Result type for the admin API.
pub type Result<T> = std::result::Result<T, ApiError>;
