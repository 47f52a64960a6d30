//! Redis Store Module
//!
//! [`KeyValueStore`] over a single multiplexed Redis connection. `rediss://`
//! URIs negotiate TLS through rustls.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, AsyncConnectionConfig, Client};

use super::{parse_info, KeyValueStore};
use crate::error::{StoreError, StoreResult};

/// Redis-backed store. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Opens one connection to `url`.
    ///
    /// `connect_timeout` bounds the TCP/TLS handshake; `command_timeout` bounds
    /// each response on the established connection.
    pub async fn connect(
        url: &str,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> StoreResult<Self> {
        let client = Client::open(url)?;
        let config = AsyncConnectionConfig::new()
            .set_connection_timeout(connect_timeout)
            .set_response_timeout(command_timeout);
        let conn = client
            .get_multiplexed_async_connection_with_config(&config)
            .await?;
        Ok(Self { conn })
    }

    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

fn classify(err: redis::RedisError) -> StoreError {
    if err.is_connection_dropped() || err.is_connection_refusal() {
        StoreError::ConnectionLost(err.to_string())
    } else {
        StoreError::Redis(err)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value: Option<String> = self.conn().get(key).await.map_err(classify)?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        let _: () = self
            .conn()
            .set_ex(key, value, ttl_seconds)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let removed: u64 = self.conn().del(keys).await.map_err(classify)?;
        Ok(removed)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let count: i64 = self.conn().incr(key, 1_i64).await.map_err(classify)?;
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        let seconds = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        let applied: bool = self.conn().expire(key, seconds).await.map_err(classify)?;
        Ok(applied)
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        let remaining: i64 = self.conn().ttl(key).await.map_err(classify)?;
        Ok(remaining)
    }

    async fn dbsize(&self) -> StoreResult<u64> {
        let count: u64 = redis::cmd("DBSIZE")
            .query_async(&mut self.conn())
            .await
            .map_err(classify)?;
        Ok(count)
    }

    async fn info(&self) -> StoreResult<BTreeMap<String, String>> {
        let raw: String = redis::cmd("INFO")
            .query_async(&mut self.conn())
            .await
            .map_err(classify)?;
        Ok(parse_info(&raw))
    }

    async fn flush_all(&self) -> StoreResult<()> {
        let _: () = redis::cmd("FLUSHALL")
            .query_async(&mut self.conn())
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let _: String = redis::cmd("PING")
            .query_async(&mut self.conn())
            .await
            .map_err(classify)?;
        Ok(())
    }
}
