//! Cache Service Module
//!
//! The domain cache facade. Route handlers ask it for limits, profiles,
//! subscriptions, question banks and analytics before going to the database,
//! and repopulate or invalidate it around writes.
//!
//! Nothing here returns an error. A read yields `None` for a missing key, an
//! unreachable store and an undecodable payload alike; a write or delete
//! yields `false` when it did not complete within budget.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::keys::{self, KeyFamily, QuestionListQuery};
use crate::cache::{CacheMetrics, CacheStats, OperationGuard};
use crate::config::CacheConfig;
use crate::connector::StoreConnector;

// == Cache Service ==
/// Typed get/set/invalidate over the shared store connection.
///
/// Cheap to clone; clones share the connector and counters.
#[derive(Clone)]
pub struct CacheService {
    pub(crate) guard: OperationGuard,
    pub(crate) op_timeout: Duration,
    pub(crate) bulk_timeout: Duration,
}

impl CacheService {
    // == Constructor ==
    /// Creates a service over `connector` with the budgets from `config`.
    pub fn new(connector: Arc<StoreConnector>, config: &CacheConfig) -> Self {
        Self {
            guard: OperationGuard::new(connector, Arc::new(CacheMetrics::new())),
            op_timeout: config.op_timeout(),
            bulk_timeout: config.bulk_timeout(),
        }
    }

    // == Init ==
    /// Acquires (or reuses) the store connection. Safe to call repeatedly.
    pub async fn init(&self) -> bool {
        self.guard.connector().connect().await.is_some()
    }

    /// True while the store connection is ready. Never performs I/O.
    pub fn is_available(&self) -> bool {
        self.guard.connector().is_available()
    }

    pub fn connector(&self) -> &Arc<StoreConnector> {
        self.guard.connector()
    }

    /// Snapshot of the hit/miss/failure counters.
    pub fn metrics(&self) -> CacheStats {
        self.guard.metrics().snapshot()
    }

    // == Generic Operations ==
    /// Reads and decodes the JSON value at `key`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let owned = key.to_string();
        let raw = self
            .guard
            .run("get", self.op_timeout, |store| async move {
                store.get(&owned).await
            })
            .await?;

        let metrics = self.guard.metrics();
        let Some(raw) = raw else {
            debug!(key, "Cache miss");
            metrics.record_miss();
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "Cache hit");
                metrics.record_hit();
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                metrics.record_decode_failure();
                None
            }
        }
    }

    /// Encodes `value` as JSON and stores it at `key` for `ttl_seconds`.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> bool {
        if ttl_seconds == 0 {
            debug!(key, "Refusing to cache with zero TTL");
            return false;
        }
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "Value not serializable, not cached");
                return false;
            }
        };

        let owned = key.to_string();
        let stored = self
            .guard
            .run("set", self.op_timeout, |store| async move {
                store.set_ex(&owned, &payload, ttl_seconds).await
            })
            .await
            .is_some();
        if stored {
            self.guard.metrics().record_write();
        }
        stored
    }

    /// Deletes `key`. A key that does not exist counts as success.
    pub async fn invalidate(&self, key: &str) -> bool {
        let keys = vec![key.to_string()];
        self.guard
            .run("del", self.op_timeout, |store| async move {
                store.del(&keys).await
            })
            .await
            .is_some()
    }

    async fn set_family<T: Serialize + ?Sized>(
        &self,
        family: KeyFamily,
        key: &str,
        value: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.set_json(key, value, ttl.unwrap_or_else(|| family.default_ttl()))
            .await
    }

    // == Limits ==
    pub async fn get_limits<T: DeserializeOwned>(&self, user_id: &str) -> Option<T> {
        self.get_json(&keys::limits_key(user_id)).await
    }

    pub async fn set_limits<T: Serialize + ?Sized>(
        &self,
        user_id: &str,
        limits: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.set_family(KeyFamily::Limits, &keys::limits_key(user_id), limits, ttl)
            .await
    }

    pub async fn invalidate_limits(&self, user_id: &str) -> bool {
        self.invalidate(&keys::limits_key(user_id)).await
    }

    // == Profile ==
    pub async fn get_profile<T: DeserializeOwned>(&self, user_id: &str) -> Option<T> {
        self.get_json(&keys::profile_key(user_id)).await
    }

    pub async fn set_profile<T: Serialize + ?Sized>(
        &self,
        user_id: &str,
        profile: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.set_family(KeyFamily::Profile, &keys::profile_key(user_id), profile, ttl)
            .await
    }

    pub async fn invalidate_profile(&self, user_id: &str) -> bool {
        self.invalidate(&keys::profile_key(user_id)).await
    }

    // == Subscription ==
    pub async fn get_subscription<T: DeserializeOwned>(&self, user_id: &str) -> Option<T> {
        self.get_json(&keys::subscription_key(user_id)).await
    }

    pub async fn set_subscription<T: Serialize + ?Sized>(
        &self,
        user_id: &str,
        subscription: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.set_family(
            KeyFamily::Subscription,
            &keys::subscription_key(user_id),
            subscription,
            ttl,
        )
        .await
    }

    /// Call after a purchase, renewal or cancellation.
    pub async fn invalidate_subscription(&self, user_id: &str) -> bool {
        self.invalidate(&keys::subscription_key(user_id)).await
    }

    // == Question Lists ==
    pub async fn get_question_list<T: DeserializeOwned>(
        &self,
        query: &QuestionListQuery,
    ) -> Option<T> {
        self.get_json(&query.cache_key()).await
    }

    pub async fn set_question_list<T: Serialize + ?Sized>(
        &self,
        query: &QuestionListQuery,
        questions: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.set_family(KeyFamily::QuestionList, &query.cache_key(), questions, ttl)
            .await
    }

    pub async fn invalidate_question_list(&self, query: &QuestionListQuery) -> bool {
        self.invalidate(&query.cache_key()).await
    }

    // == Full Question ==
    pub async fn get_question<T: DeserializeOwned>(&self, question_id: &str) -> Option<T> {
        self.get_json(&keys::question_key(question_id)).await
    }

    pub async fn set_question<T: Serialize + ?Sized>(
        &self,
        question_id: &str,
        question: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.set_family(
            KeyFamily::Question,
            &keys::question_key(question_id),
            question,
            ttl,
        )
        .await
    }

    pub async fn invalidate_question(&self, question_id: &str) -> bool {
        self.invalidate(&keys::question_key(question_id)).await
    }

    // == Analytics ==
    pub async fn get_analytics<T: DeserializeOwned>(&self, user_id: &str) -> Option<T> {
        self.get_json(&keys::analytics_key(user_id)).await
    }

    pub async fn set_analytics<T: Serialize + ?Sized>(
        &self,
        user_id: &str,
        analytics: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.set_family(
            KeyFamily::Analytics,
            &keys::analytics_key(user_id),
            analytics,
            ttl,
        )
        .await
    }

    /// Call after a test attempt is submitted.
    pub async fn invalidate_analytics(&self, user_id: &str) -> bool {
        self.invalidate(&keys::analytics_key(user_id)).await
    }

    // == Chapters ==
    pub async fn get_chapters<T: DeserializeOwned>(
        &self,
        exam_type: &str,
        subject: &str,
    ) -> Option<T> {
        self.get_json(&keys::chapters_key(exam_type, subject)).await
    }

    pub async fn set_chapters<T: Serialize + ?Sized>(
        &self,
        exam_type: &str,
        subject: &str,
        chapters: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.set_family(
            KeyFamily::Chapters,
            &keys::chapters_key(exam_type, subject),
            chapters,
            ttl,
        )
        .await
    }

    pub async fn invalidate_chapters(&self, exam_type: &str, subject: &str) -> bool {
        self.invalidate(&keys::chapters_key(exam_type, subject)).await
    }

    // == Topics ==
    pub async fn get_topics<T: DeserializeOwned>(
        &self,
        exam_type: &str,
        subject: &str,
        chapter: &str,
    ) -> Option<T> {
        self.get_json(&keys::topics_key(exam_type, subject, chapter))
            .await
    }

    pub async fn set_topics<T: Serialize + ?Sized>(
        &self,
        exam_type: &str,
        subject: &str,
        chapter: &str,
        topics: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.set_family(
            KeyFamily::Topics,
            &keys::topics_key(exam_type, subject, chapter),
            topics,
            ttl,
        )
        .await
    }

    pub async fn invalidate_topics(&self, exam_type: &str, subject: &str, chapter: &str) -> bool {
        self.invalidate(&keys::topics_key(exam_type, subject, chapter))
            .await
    }
}
