//! Store Entry Module
//!
//! A single value held by the in-process store, with optional expiry.

use std::time::{SystemTime, UNIX_EPOCH};

// == Store Entry ==
/// Represents a single stored value with expiry metadata.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// The stored value
    pub value: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoreEntry {
    // == Constructor ==
    /// Creates a new entry with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_seconds` - Optional TTL in seconds
    pub fn new(value: String, ttl_seconds: Option<u64>) -> Self {
        let mut entry = Self {
            value,
            expires_at: None,
        };
        if let Some(ttl) = ttl_seconds {
            entry.expire_in(ttl);
        }
        entry
    }

    // == Expire In ==
    /// Sets the entry to expire `ttl_seconds` from now, replacing any previous expiry.
    pub fn expire_in(&mut self, ttl_seconds: u64) {
        let now = current_timestamp_ms();
        self.expires_at = Some(now.saturating_add(ttl_seconds.saturating_mul(1000)));
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiration time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }

    /// Remaining TTL in whole seconds, rounded up so a live entry never reports 0.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.ttl_remaining_ms().map(|ms| ms.div_ceil(1000))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
