//! Configuration Module
//!
//! Handles loading cache and admin server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which key-value store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Remote Redis reached through `REDIS_URL`
    Redis,
    /// In-process store, for local runs without a Redis instance
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(BackendKind::Redis),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// A missing `REDIS_URL` is not an error: caching is simply disabled.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Store connection URI (`redis://` or `rediss://`)
    pub redis_url: Option<String>,
    /// Store implementation to use
    pub backend: BackendKind,
    /// Timeout for establishing the connection, in milliseconds
    pub connect_timeout_ms: u64,
    /// Per-command response timeout on the connection, in milliseconds
    pub command_timeout_ms: u64,
    /// Retries after the first failed connect attempt
    pub max_retries: u32,
    /// Linear backoff step between connect attempts, in milliseconds
    pub retry_step_ms: u64,
    /// Backoff ceiling, in milliseconds
    pub retry_cap_ms: u64,
    /// Minimum gap between background re-dials after the connection is lost
    pub reconnect_cooldown_ms: u64,
    /// Wait budget for single-key operations, in milliseconds
    pub op_timeout_ms: u64,
    /// Wait budget for multi-key and administrative operations, in milliseconds
    pub bulk_timeout_ms: u64,
    /// Admin HTTP server port
    pub server_port: u16,
    /// Admin requests allowed per window per client
    pub admin_rate_limit: u64,
    /// Admin rate-limit window in seconds
    pub admin_rate_window: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Store URI (default: unset, caching disabled)
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `REDIS_CONNECT_TIMEOUT_MS` - Connect timeout (default: 5000)
    /// - `REDIS_COMMAND_TIMEOUT_MS` - Command timeout (default: 3000)
    /// - `REDIS_MAX_RETRIES` - Connect retries (default: 3)
    /// - `REDIS_RETRY_STEP_MS` - Backoff step (default: 200)
    /// - `REDIS_RETRY_CAP_MS` - Backoff ceiling (default: 1000)
    /// - `REDIS_RECONNECT_COOLDOWN_MS` - Gap between re-dials (default: 5000)
    /// - `CACHE_OP_TIMEOUT_MS` - Single-key budget (default: 500)
    /// - `CACHE_BULK_TIMEOUT_MS` - Multi-key budget (default: 1000)
    /// - `SERVER_PORT` - Admin HTTP port (default: 3000)
    /// - `ADMIN_RATE_LIMIT` - Admin requests per window (default: 60)
    /// - `ADMIN_RATE_WINDOW` - Admin window seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env::var("REDIS_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            backend: parse_var("CACHE_BACKEND").unwrap_or(defaults.backend),
            connect_timeout_ms: parse_var("REDIS_CONNECT_TIMEOUT_MS")
                .unwrap_or(defaults.connect_timeout_ms),
            command_timeout_ms: parse_var("REDIS_COMMAND_TIMEOUT_MS")
                .unwrap_or(defaults.command_timeout_ms),
            max_retries: parse_var("REDIS_MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_step_ms: parse_var("REDIS_RETRY_STEP_MS").unwrap_or(defaults.retry_step_ms),
            retry_cap_ms: parse_var("REDIS_RETRY_CAP_MS").unwrap_or(defaults.retry_cap_ms),
            reconnect_cooldown_ms: parse_var("REDIS_RECONNECT_COOLDOWN_MS")
                .unwrap_or(defaults.reconnect_cooldown_ms),
            op_timeout_ms: parse_var("CACHE_OP_TIMEOUT_MS").unwrap_or(defaults.op_timeout_ms),
            bulk_timeout_ms: parse_var("CACHE_BULK_TIMEOUT_MS")
                .unwrap_or(defaults.bulk_timeout_ms),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            admin_rate_limit: parse_var("ADMIN_RATE_LIMIT").unwrap_or(defaults.admin_rate_limit),
            admin_rate_window: parse_var("ADMIN_RATE_WINDOW")
                .unwrap_or(defaults.admin_rate_window),
        }
    }

    /// Budget for single-key reads, writes and deletes.
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    /// Budget for multi-key and administrative operations.
    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_millis(self.bulk_timeout_ms)
    }

    /// Minimum gap between background re-dials.
    pub fn reconnect_cooldown(&self) -> Duration {
        Duration::from_millis(self.reconnect_cooldown_ms)
    }

    /// Backoff before connect attempt `attempt` (1-based), capped at `retry_cap_ms`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let delay = self.retry_step_ms.saturating_mul(u64::from(attempt));
        Duration::from_millis(delay.min(self.retry_cap_ms))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            backend: BackendKind::Redis,
            connect_timeout_ms: 5000,
            command_timeout_ms: 3000,
            max_retries: 3,
            retry_step_ms: 200,
            retry_cap_ms: 1000,
            reconnect_cooldown_ms: 5000,
            op_timeout_ms: 500,
            bulk_timeout_ms: 1000,
            server_port: 3000,
            admin_rate_limit: 60,
            admin_rate_window: 60,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
