//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key construction and facade round-trips.

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::keys::{self, KeyFamily, QuestionListQuery};
use crate::cache::CacheService;
use crate::config::CacheConfig;
use crate::connector::StoreConnector;
use crate::store::MemoryStore;

// == Strategies ==
/// Identifier segments that never contain the `:` delimiter
fn id_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,24}".prop_map(|s| s)
}

fn query_strategy() -> impl Strategy<Value = QuestionListQuery> {
    (
        id_strategy(),
        id_strategy(),
        prop::option::of(id_strategy()),
        prop::option::of(id_strategy()),
        1u32..500,
    )
        .prop_map(|(exam_type, subject, chapter, topic, page)| QuestionListQuery {
            exam_type,
            subject,
            chapter,
            topic,
            page,
        })
}

/// Arbitrary JSON-friendly payloads
fn payload_strategy() -> impl Strategy<Value = BTreeMap<String, Vec<i64>>> {
    prop::collection::btree_map(id_strategy(), prop::collection::vec(any::<i64>(), 0..8), 0..6)
}

fn ready_service() -> CacheService {
    let config = CacheConfig::default();
    let connector = Arc::new(StoreConnector::with_store(
        Arc::new(MemoryStore::new()),
        &config,
    ));
    CacheService::new(connector, &config)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Building a key twice from the same identifiers yields the same string.
    #[test]
    fn prop_key_determinism(user_id in id_strategy(), query in query_strategy()) {
        prop_assert_eq!(keys::limits_key(&user_id), keys::limits_key(&user_id.clone()));
        prop_assert_eq!(query.cache_key(), query.clone().cache_key());
    }

    // Distinct identifier tuples map to distinct keys within a family.
    #[test]
    fn prop_distinct_ids_distinct_keys(
        a in (id_strategy(), id_strategy(), id_strategy()),
        b in (id_strategy(), id_strategy(), id_strategy())
    ) {
        let key_a = keys::topics_key(&a.0, &a.1, &a.2);
        let key_b = keys::topics_key(&b.0, &b.1, &b.2);
        prop_assert_eq!(a == b, key_a == key_b);
    }

    #[test]
    fn prop_distinct_queries_distinct_keys(a in query_strategy(), b in query_strategy()) {
        prop_assume!(a.chapter.as_deref() != Some(keys::ANY_SEGMENT));
        prop_assume!(b.chapter.as_deref() != Some(keys::ANY_SEGMENT));
        prop_assume!(a.topic.as_deref() != Some(keys::ANY_SEGMENT));
        prop_assume!(b.topic.as_deref() != Some(keys::ANY_SEGMENT));
        prop_assert_eq!(a == b, a.cache_key() == b.cache_key());
    }

    // The same user id never collides across per-user families.
    #[test]
    fn prop_families_do_not_collide(user_id in id_strategy()) {
        let mut all: Vec<String> = KeyFamily::PER_USER
            .iter()
            .map(|family| family.key(&[user_id.as_str()]))
            .collect();
        all.push(keys::question_key(&user_id));
        let total = all.len();
        all.sort();
        all.dedup();
        prop_assert_eq!(all.len(), total);
    }

    // A value written and read back before expiry is deep-equal.
    #[test]
    fn prop_roundtrip_storage(user_id in id_strategy(), payload in payload_strategy()) {
        let cached = tokio_test::block_on(async {
            let cache = ready_service();
            cache.init().await;
            assert!(cache.set_analytics(&user_id, &payload, Some(60)).await);
            cache.get_analytics::<BTreeMap<String, Vec<i64>>>(&user_id).await
        });
        prop_assert_eq!(cached, Some(payload));
    }

    // After invalidation a read is a miss.
    #[test]
    fn prop_invalidate_removes_entry(question_id in id_strategy(), payload in payload_strategy()) {
        let cached = tokio_test::block_on(async {
            let cache = ready_service();
            cache.init().await;
            cache.set_question(&question_id, &payload, None).await;
            assert!(cache.invalidate_question(&question_id).await);
            cache.get_question::<BTreeMap<String, Vec<i64>>>(&question_id).await
        });
        prop_assert_eq!(cached, None);
    }
}
