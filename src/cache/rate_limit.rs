//! Rate Limiter
//!
//! Fixed-window counters kept in the store. The first increment of a window
//! creates the counter and arms its expiry; the window resets when the
//! counter expires.
//!
//! Increment and expiry are two separate commands. The increment is atomic,
//! so concurrent callers always get distinct counts, but a caller that dies
//! (or times out) between them leaves a counter with no expiry. Every check
//! therefore reads the TTL and re-arms a counter found without one; until
//! then the key may stay blocked for longer than one window.
//!
//! When the store is unavailable or too slow the limiter fails open.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::CacheService;
use crate::error::StoreResult;
use crate::store::{KeyValueStore, TTL_PERSISTENT};

// == Rate Limit Decision ==
/// Outcome of one rate-limit check.
///
/// Count fields are absent when the limiter failed open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_in: Option<u64>,
}

impl RateLimitDecision {
    /// Permissive decision with no count information.
    pub fn fail_open() -> Self {
        Self {
            allowed: true,
            current: None,
            limit: None,
            reset_in: None,
        }
    }

    /// True when the decision carries no count, i.e. the store was not consulted.
    pub fn is_fail_open(&self) -> bool {
        self.allowed && self.current.is_none()
    }
}

/// Counter value and remaining window after one increment.
struct WindowState {
    count: i64,
    remaining: i64,
}

async fn hit_window(
    store: Arc<dyn KeyValueStore>,
    key: String,
    window_seconds: u64,
) -> StoreResult<WindowState> {
    let count = store.incr(&key).await?;
    if count == 1 {
        store.expire(&key, window_seconds).await?;
    }

    let mut remaining = store.ttl(&key).await?;
    if remaining == TTL_PERSISTENT {
        // Counter survived without an expiry; re-arm so it cannot block forever
        info!(key = %key, "Re-arming rate limit window");
        store.expire(&key, window_seconds).await?;
        remaining = window_seconds as i64;
    }

    Ok(WindowState { count, remaining })
}

impl CacheService {
    // == Check Rate Limit ==
    /// Counts one request against `key` and decides whether it is allowed.
    ///
    /// Allowed iff the post-increment count is at most `limit`.
    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> RateLimitDecision {
        let window_seconds = window_seconds.max(1);
        let owned = key.to_string();
        let state = self
            .guard
            .run("rate_limit", self.bulk_timeout, |store| {
                hit_window(store, owned, window_seconds)
            })
            .await;

        let Some(state) = state else {
            debug!(key, "Rate limiter failing open");
            return RateLimitDecision::fail_open();
        };

        let current = u64::try_from(state.count).unwrap_or(0);
        RateLimitDecision {
            allowed: current <= limit,
            current: Some(current),
            limit: Some(limit),
            reset_in: Some(u64::try_from(state.remaining).unwrap_or(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::connector::StoreConnector;
    use crate::store::MemoryStore;
    use std::time::Duration;

    async fn ready_service() -> (CacheService, Arc<StoreConnector>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = CacheConfig::default();
        let connector = Arc::new(StoreConnector::with_store(store.clone(), &config));
        let service = CacheService::new(connector.clone(), &config);
        service.init().await;
        (service, connector, store)
    }

    #[tokio::test]
    async fn test_fixed_window_allows_up_to_limit() {
        let (cache, _, _) = ready_service().await;

        for expected in 1..=5 {
            let decision = cache.check_rate_limit("rl:u1", 5, 10).await;
            assert!(decision.allowed);
            assert_eq!(decision.current, Some(expected));
            assert_eq!(decision.limit, Some(5));
        }

        let sixth = cache.check_rate_limit("rl:u1", 5, 10).await;
        assert!(!sixth.allowed);
        assert_eq!(sixth.current, Some(6));
        let reset_in = sixth.reset_in.unwrap();
        assert!(reset_in > 0 && reset_in <= 10);
    }

    #[tokio::test]
    async fn test_window_resets_after_expiry() {
        let (cache, _, _) = ready_service().await;

        assert!(cache.check_rate_limit("rl:u2", 1, 1).await.allowed);
        assert!(!cache.check_rate_limit("rl:u2", 1, 1).await.allowed);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let fresh = cache.check_rate_limit("rl:u2", 1, 1).await;
        assert!(fresh.allowed);
        assert_eq!(fresh.current, Some(1));
    }

    #[tokio::test]
    async fn test_keys_are_counted_independently() {
        let (cache, _, _) = ready_service().await;

        assert!(cache.check_rate_limit("rl:a", 1, 10).await.allowed);
        assert!(cache.check_rate_limit("rl:b", 1, 10).await.allowed);
        assert!(!cache.check_rate_limit("rl:a", 1, 10).await.allowed);
    }

    #[tokio::test]
    async fn test_fails_open_when_unavailable() {
        let (cache, connector, _) = ready_service().await;

        for _ in 0..3 {
            cache.check_rate_limit("rl:u3", 1, 10).await;
        }
        connector.disconnect();

        let decision = cache.check_rate_limit("rl:u3", 1, 10).await;
        assert_eq!(decision, RateLimitDecision::fail_open());
        assert!(decision.is_fail_open());
    }

    #[tokio::test]
    async fn test_rearms_counter_without_expiry() {
        let (cache, _, store) = ready_service().await;
        store.incr("rl:stuck").await.unwrap();
        store.incr("rl:stuck").await.unwrap();

        let decision = cache.check_rate_limit("rl:stuck", 10, 30).await;
        assert_eq!(decision.current, Some(3));
        assert_eq!(decision.reset_in, Some(30));
        assert_eq!(store.ttl("rl:stuck").await.unwrap(), 30);
    }

    #[test]
    fn test_fail_open_serializes_without_counts() {
        let json = serde_json::to_value(RateLimitDecision::fail_open()).unwrap();
        assert_eq!(json, serde_json::json!({"allowed": true}));
    }
}
