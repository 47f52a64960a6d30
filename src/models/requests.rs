//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for POST /rate-limit/check
///
/// # Fields
/// - `key`: Counter key, used verbatim
/// - `limit`: Requests allowed per window
/// - `window`: Window length in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitCheckRequest {
    pub key: String,
    pub limit: u64,
    pub window: u64,
}

impl RateLimitCheckRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.trim().is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > 256 {
            return Some("Key exceeds maximum length of 256 characters".to_string());
        }
        if self.window == 0 {
            return Some("Window must be at least 1 second".to_string());
        }
        None
    }
}
