//! Memory Store Module
//!
//! In-process key-value store mirroring the Redis command semantics the cache
//! relies on. Expired entries are dropped lazily on access.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{KeyValueStore, StoreEntry, TTL_MISSING, TTL_PERSISTENT};
use crate::error::{StoreError, StoreResult};

// == Memory Store ==
/// HashMap-backed store with TTL support.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Key-value storage
    entries: Mutex<HashMap<String, StoreEntry>>,
    /// When set, every command fails as if the connection dropped
    offline: AtomicBool,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Offline Toggle ==
    /// Makes every subsequent command fail with `StoreError::ConnectionLost`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    // == Length ==
    /// Returns the number of live entries.
    pub async fn len(&self) -> usize {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| !entry.is_expired());
        entries.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::ConnectionLost("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Looks up `key`, evicting it first if it has expired.
fn live_entry<'a>(
    entries: &'a mut HashMap<String, StoreEntry>,
    key: &str,
) -> Option<&'a mut StoreEntry> {
    if entries.get(key).is_some_and(StoreEntry::is_expired) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        Ok(live_entry(&mut entries, key).map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            StoreEntry::new(value.to_string(), Some(ttl_seconds)),
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        match live_entry(&mut entries, key) {
            Some(entry) => {
                let current: i64 = entry
                    .value
                    .parse()
                    .map_err(|_| StoreError::InvalidValue(key.to_string()))?;
                let next = current
                    .checked_add(1)
                    .ok_or_else(|| StoreError::InvalidValue(key.to_string()))?;
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                entries.insert(key.to_string(), StoreEntry::new("1".to_string(), None));
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        match live_entry(&mut entries, key) {
            Some(entry) => {
                entry.expire_in(ttl_seconds);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        Ok(match live_entry(&mut entries, key) {
            Some(entry) => entry
                .ttl_remaining()
                .map(|secs| secs as i64)
                .unwrap_or(TTL_PERSISTENT),
            None => TTL_MISSING,
        })
    }

    async fn dbsize(&self) -> StoreResult<u64> {
        self.check_online()?;
        Ok(self.len().await as u64)
    }

    async fn info(&self) -> StoreResult<BTreeMap<String, String>> {
        self.check_online()?;
        let keys = self.len().await;
        let mut info = BTreeMap::new();
        info.insert("backend".to_string(), "memory".to_string());
        info.insert("keys".to_string(), keys.to_string());
        Ok(info)
    }

    async fn flush_all(&self) -> StoreResult<()> {
        self.check_online()?;
        self.entries.lock().await.clear();
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_online()
    }
}
