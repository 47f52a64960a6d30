//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::connector::ConnectionStatus;

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    pub cleared: bool,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        Self {
            message: "Cache cleared successfully".to_string(),
            cleared: true,
        }
    }
}

/// Response body for DELETE /cache/users/:user_id
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Success message
    pub message: String,
    /// The user whose entries were dropped
    pub user_id: String,
}

impl InvalidateResponse {
    /// Creates a new InvalidateResponse
    pub fn new(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            message: format!("Cache for user '{}' invalidated", user_id),
            user_id,
        }
    }
}

/// Response body for the health endpoint (GET /health)
///
/// The process is healthy whether or not the cache tier is up; `cache`
/// reports the store connection separately.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (always "healthy")
    pub status: String,
    /// Store connection status
    pub cache: ConnectionStatus,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(cache: ConnectionStatus) -> Self {
        Self {
            status: "healthy".to_string(),
            cache,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
