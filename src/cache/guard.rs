//! Operation Guard
//!
//! Every store call made by the cache goes through [`OperationGuard::run`].
//! It is the single place store errors are caught: the call is skipped when
//! the store is not ready, raced against its wait budget, and any failure is
//! collapsed into `None`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::CacheMetrics;
use crate::connector::StoreConnector;
use crate::error::StoreResult;
use crate::store::KeyValueStore;

/// Bounded-time, failure-absorbing runner for store operations.
#[derive(Clone)]
pub struct OperationGuard {
    connector: Arc<StoreConnector>,
    metrics: Arc<CacheMetrics>,
}

impl OperationGuard {
    pub fn new(connector: Arc<StoreConnector>, metrics: Arc<CacheMetrics>) -> Self {
        Self { connector, metrics }
    }

    pub fn connector(&self) -> &Arc<StoreConnector> {
        &self.connector
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    /// Runs `op` against the live store, waiting at most `budget`.
    ///
    /// Returns `None` when the store is not ready, when `op` fails, or when
    /// the budget elapses. On timeout the pending call is dropped; its reply,
    /// if any, is discarded by the connection and never reaches a later call.
    ///
    /// A skipped call may schedule a background re-dial but never waits for it.
    pub async fn run<T, F, Fut>(&self, op: &'static str, budget: Duration, f: F) -> Option<T>
    where
        F: FnOnce(Arc<dyn KeyValueStore>) -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let Some(lease) = self.connector.lease() else {
            let redialing = self.connector.redial_in_background();
            debug!(op, redialing, "Cache store unavailable, skipping");
            self.metrics.record_skipped();
            return None;
        };

        match tokio::time::timeout(budget, f(lease.store)).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(op, error = %e, "Cache operation failed");
                self.metrics.record_error();
                if e.is_connection_lost() {
                    self.connector.report_lost(lease.generation);
                }
                None
            }
            Err(_) => {
                warn!(
                    op,
                    budget_ms = budget.as_millis() as u64,
                    "Cache operation timed out"
                );
                self.metrics.record_timeout();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use std::time::Instant;

    async fn ready_guard(store: Arc<MemoryStore>) -> OperationGuard {
        let connector = Arc::new(StoreConnector::with_store(store, &CacheConfig::default()));
        connector.connect().await.unwrap();
        OperationGuard::new(connector, Arc::new(CacheMetrics::new()))
    }

    #[tokio::test]
    async fn test_run_returns_value() {
        let store = Arc::new(MemoryStore::new());
        let guard = ready_guard(store).await;

        let result = guard
            .run("ping", Duration::from_millis(500), |store| async move {
                store.ping().await.map(|_| 42)
            })
            .await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_run_skips_when_unavailable() {
        let connector = Arc::new(StoreConnector::disabled());
        let guard = OperationGuard::new(connector, Arc::new(CacheMetrics::new()));

        let result = guard
            .run("ping", Duration::from_millis(500), |_| async move { Ok::<_, StoreError>(1) })
            .await;
        assert_eq!(result, None);
        assert_eq!(guard.metrics().snapshot().skipped, 1);
    }

    #[tokio::test]
    async fn test_run_times_out_hanging_operation() {
        let guard = ready_guard(Arc::new(MemoryStore::new())).await;

        let started = Instant::now();
        let result: Option<()> = guard
            .run("hang", Duration::from_millis(100), |_| async move {
                std::future::pending::<()>().await;
                Ok::<_, StoreError>(())
            })
            .await;

        assert_eq!(result, None);
        assert!(started.elapsed() < Duration::from_millis(300));
        assert_eq!(guard.metrics().snapshot().timeouts, 1);
    }

    #[tokio::test]
    async fn test_run_absorbs_errors() {
        let guard = ready_guard(Arc::new(MemoryStore::new())).await;

        let result: Option<()> = guard
            .run("bad", Duration::from_millis(500), |_| async move {
                Err(StoreError::InvalidValue("k".to_string()))
            })
            .await;

        assert_eq!(result, None);
        assert_eq!(guard.metrics().snapshot().errors, 1);
        assert!(guard.connector().is_available());
    }

    #[tokio::test]
    async fn test_connection_loss_tears_down_connector() {
        let store = Arc::new(MemoryStore::new());
        let guard = ready_guard(store.clone()).await;
        store.set_offline(true);

        let result = guard
            .run("get", Duration::from_millis(500), |store| async move {
                store.get("k").await
            })
            .await;

        assert_eq!(result, None);
        assert!(!guard.connector().is_available());
    }

    #[tokio::test]
    async fn test_skipped_call_redials_after_store_recovers() {
        let store = Arc::new(MemoryStore::new());
        let config = CacheConfig {
            reconnect_cooldown_ms: 30,
            ..CacheConfig::default()
        };
        let connector = Arc::new(StoreConnector::with_store(store.clone(), &config));
        connector.connect().await.unwrap();
        let guard = OperationGuard::new(connector, Arc::new(CacheMetrics::new()));

        store.set_offline(true);
        let lost = guard
            .run("get", Duration::from_millis(500), |store| async move {
                store.get("k").await
            })
            .await;
        assert_eq!(lost, None);
        store.set_offline(false);

        let mut recovered = None;
        for _ in 0..20 {
            recovered = guard
                .run("ping", Duration::from_millis(500), |store| async move {
                    store.ping().await.map(|_| true)
                })
                .await;
            if recovered.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(recovered, Some(true));
        assert!(guard.connector().is_available());
    }
}
