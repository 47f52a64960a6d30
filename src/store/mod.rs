//! Store Module
//!
//! The key-value store seam the cache sits on. The connector hands out
//! `Arc<dyn KeyValueStore>` handles; everything above it is store-agnostic.
//!
//! Two implementations:
//! - [`RedisStore`] - remote Redis over a multiplexed (optionally TLS) connection
//! - [`MemoryStore`] - in-process store with the same command semantics

mod entry;
mod memory;
mod redis_store;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::StoreResult;

use self::entry::StoreEntry;
pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// `ttl` reply for a key that does not exist.
pub const TTL_MISSING: i64 = -2;

/// `ttl` reply for a key that exists without an expiry.
pub const TTL_PERSISTENT: i64 = -1;

/// Commands the cache layer issues against a key-value store.
///
/// Every method is a suspension point. Implementations report failures as
/// `StoreError`; they never retry on their own.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value at `key`, or None if absent.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` at `key`, expiring after `ttl_seconds`.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()>;

    /// Deletes every listed key, returning how many existed.
    async fn del(&self, keys: &[String]) -> StoreResult<u64>;

    /// Atomically increments the integer at `key` (absent counts as 0).
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    /// Sets the expiry of `key`; returns false if the key does not exist.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool>;

    /// Remaining seconds to live, [`TTL_PERSISTENT`] or [`TTL_MISSING`].
    async fn ttl(&self, key: &str) -> StoreResult<i64>;

    /// Number of keys in the current database.
    async fn dbsize(&self) -> StoreResult<u64>;

    /// Server-reported statistics as flat `field -> value` pairs.
    async fn info(&self) -> StoreResult<BTreeMap<String, String>>;

    /// Removes every key in every database.
    async fn flush_all(&self) -> StoreResult<()>;

    /// Round-trip liveness check.
    async fn ping(&self) -> StoreResult<()>;
}

/// Parses the text body of an `INFO` reply into `field -> value` pairs.
///
/// Section headers (`# Server`) and blank lines are skipped.
pub fn parse_info(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_info_skips_headers() {
        let raw = "# Server\r\nredis_version:7.2.4\r\n\r\n# Memory\r\nused_memory:1024\r\n";
        let info = parse_info(raw);

        assert_eq!(info.len(), 2);
        assert_eq!(info["redis_version"], "7.2.4");
        assert_eq!(info["used_memory"], "1024");
    }

    #[test]
    fn test_parse_info_keeps_colons_in_values() {
        let info = parse_info("executable:/usr/bin/redis-server\nconfig:c:\\redis.conf");
        assert_eq!(info["executable"], "/usr/bin/redis-server");
        assert_eq!(info["config"], "c:\\redis.conf");
    }
}
