//! Admin Operations
//!
//! Account-level bulk invalidation, full flush, and connection statistics.
//! These run under the longer multi-key budget.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::keys;
use crate::cache::{CacheService, CacheStats};
use crate::connector::ConnectionStatus;
use crate::error::StoreResult;
use crate::store::KeyValueStore;

// == Cache Stats Report ==
/// Connection status, store-reported figures and facade counters.
///
/// When the store is unavailable `key_count` and `server` are absent; the
/// report itself is still returned.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsReport {
    pub connected: bool,
    pub status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<BTreeMap<String, String>>,
    pub metrics: CacheStats,
    pub hit_rate: f64,
}

async fn store_figures(
    store: Arc<dyn KeyValueStore>,
) -> StoreResult<(u64, BTreeMap<String, String>)> {
    let key_count = store.dbsize().await?;
    let server = store.info().await?;
    Ok((key_count, server))
}

impl CacheService {
    // == Invalidate User Cache ==
    /// Drops the limits, profile, subscription and analytics entries of
    /// `user_id` in one multi-key delete.
    pub async fn invalidate_user_cache(&self, user_id: &str) -> bool {
        let user_keys = keys::user_keys(user_id);
        let removed = self
            .guard
            .run("del_user", self.bulk_timeout, |store| async move {
                store.del(&user_keys).await
            })
            .await;

        match removed {
            Some(count) => {
                info!(user_id, removed = count, "Invalidated user cache");
                true
            }
            None => false,
        }
    }

    // == Get Cache Stats ==
    pub async fn get_cache_stats(&self) -> CacheStatsReport {
        let metrics = self.metrics();
        let hit_rate = metrics.hit_rate();
        let figures = self
            .guard
            .run("stats", self.bulk_timeout, store_figures)
            .await;
        let status = self.connector().status();

        match figures {
            Some((key_count, server)) => CacheStatsReport {
                connected: true,
                status,
                key_count: Some(key_count),
                server: Some(server),
                metrics,
                hit_rate,
            },
            None => CacheStatsReport {
                connected: false,
                status,
                key_count: None,
                server: None,
                metrics,
                hit_rate,
            },
        }
    }

    // == Clear All Cache ==
    /// Empties the whole store, every family at once.
    ///
    /// Access control is the caller's responsibility.
    pub async fn clear_all_cache(&self) -> bool {
        let cleared = self
            .guard
            .run("flush_all", self.bulk_timeout, |store| async move {
                store.flush_all().await
            })
            .await
            .is_some();

        if cleared {
            warn!("Cache store flushed");
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::QuestionListQuery;
    use crate::config::CacheConfig;
    use crate::connector::StoreConnector;
    use crate::store::MemoryStore;
    use serde_json::json;

    async fn ready_service() -> (CacheService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = CacheConfig::default();
        let connector = Arc::new(StoreConnector::with_store(store.clone(), &config));
        let service = CacheService::new(connector, &config);
        service.init().await;
        (service, store)
    }

    async fn seed_user(cache: &CacheService, user_id: &str) {
        cache.set_limits(user_id, &json!({"daily": 10}), None).await;
        cache.set_profile(user_id, &json!({"name": user_id}), None).await;
        cache.set_subscription(user_id, &json!({"plan": "free"}), None).await;
        cache.set_analytics(user_id, &json!({"attempts": 3}), None).await;
    }

    #[tokio::test]
    async fn test_invalidate_user_cache_scope() {
        let (cache, store) = ready_service().await;
        seed_user(&cache, "u1").await;
        seed_user(&cache, "u2").await;
        cache.set_question("u1", &json!({"text": "?"}), None).await;
        let query = QuestionListQuery::new("JEE", "physics");
        cache.set_question_list(&query, &json!([]), None).await;

        assert!(cache.invalidate_user_cache("u1").await);

        for key in keys::user_keys("u1") {
            assert!(store.get(&key).await.unwrap().is_none(), "{key} survived");
        }
        for key in keys::user_keys("u2") {
            assert!(store.get(&key).await.unwrap().is_some(), "{key} removed");
        }
        assert!(store.get("question:full:u1").await.unwrap().is_some());
        assert!(store.get(&query.cache_key()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalidate_user_cache_without_entries() {
        let (cache, _) = ready_service().await;
        assert!(cache.invalidate_user_cache("ghost").await);
    }

    #[tokio::test]
    async fn test_stats_when_connected() {
        let (cache, _) = ready_service().await;
        seed_user(&cache, "u1").await;
        let _: Option<serde_json::Value> = cache.get_limits("u1").await;

        let report = cache.get_cache_stats().await;
        assert!(report.connected);
        assert_eq!(report.status, ConnectionStatus::Ready);
        assert_eq!(report.key_count, Some(4));
        assert_eq!(report.server.unwrap()["backend"], "memory");
        assert_eq!(report.metrics.hits, 1);
        assert_eq!(report.metrics.writes, 4);
    }

    #[tokio::test]
    async fn test_stats_degraded_when_unavailable() {
        let cache = CacheService::new(
            Arc::new(StoreConnector::disabled()),
            &CacheConfig::default(),
        );

        let report = cache.get_cache_stats().await;
        assert!(!report.connected);
        assert_eq!(report.status, ConnectionStatus::Uninitialized);
        assert!(report.key_count.is_none());
        assert!(report.server.is_none());
    }

    #[tokio::test]
    async fn test_clear_all_cache() {
        let (cache, store) = ready_service().await;
        seed_user(&cache, "u1").await;
        cache.set_chapters("NEET", "biology", &json!(["cells"]), None).await;

        assert!(cache.clear_all_cache().await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_all_cache_unavailable() {
        let cache = CacheService::new(
            Arc::new(StoreConnector::disabled()),
            &CacheConfig::default(),
        );
        assert!(!cache.clear_all_cache().await);
    }
}
