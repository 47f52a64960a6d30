//! Redis Store Tests
//!
//! Run against a live server only when `TEST_REDIS_URL` is set, e.g.
//! `TEST_REDIS_URL=redis://127.0.0.1:6379/15`. Keys are namespaced per test
//! and removed afterwards; nothing here flushes the database.

use std::time::Duration;

use prep_cache::store::{KeyValueStore, RedisStore, TTL_MISSING};

async fn redis_or_skip() -> Option<RedisStore> {
    let url = std::env::var("TEST_REDIS_URL").ok()?;
    let store = RedisStore::connect(&url, Duration::from_secs(2), Duration::from_secs(2))
        .await
        .expect("TEST_REDIS_URL is set but the server is unreachable");
    Some(store)
}

#[tokio::test]
async fn test_redis_set_get_del() {
    let Some(store) = redis_or_skip().await else {
        return;
    };
    let key = "prep_cache:test:set_get".to_string();

    store.set_ex(&key, r#"{"a":1}"#, 30).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap().as_deref(), Some(r#"{"a":1}"#));
    assert!(store.ttl(&key).await.unwrap() > 0);

    assert_eq!(store.del(&[key.clone()]).await.unwrap(), 1);
    assert_eq!(store.get(&key).await.unwrap(), None);
    assert_eq!(store.ttl(&key).await.unwrap(), TTL_MISSING);
}

#[tokio::test]
async fn test_redis_counter_window() {
    let Some(store) = redis_or_skip().await else {
        return;
    };
    let key = "prep_cache:test:counter".to_string();
    store.del(&[key.clone()]).await.unwrap();

    assert_eq!(store.incr(&key).await.unwrap(), 1);
    assert!(store.expire(&key, 10).await.unwrap());
    assert_eq!(store.incr(&key).await.unwrap(), 2);
    let remaining = store.ttl(&key).await.unwrap();
    assert!((1..=10).contains(&remaining));

    store.del(&[key]).await.unwrap();
}

#[tokio::test]
async fn test_redis_server_figures() {
    let Some(store) = redis_or_skip().await else {
        return;
    };

    store.ping().await.unwrap();
    let info = store.info().await.unwrap();
    assert!(info.contains_key("redis_version"));
    store.dbsize().await.unwrap();
}
