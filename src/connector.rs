//! Store Connector
//!
//! Owns the one connection to the key-value store: dials it with bounded
//! retries, tracks its status, and hands out handles to the operation guard.
//!
//! Status machine:
//!
//! ```text
//! Uninitialized -> Connecting -> Ready
//! Connecting -> Error -> Uninitialized      (attempt failed, a later connect may retry)
//! Ready -> Closed -> Uninitialized          (connection lost or closed)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::{BackendKind, CacheConfig};
use crate::error::StoreResult;
use crate::store::{KeyValueStore, MemoryStore, RedisStore};

// == Connection Status ==
/// Last known state of the store connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Uninitialized,
    Connecting,
    Ready,
    Error,
    Closed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionStatus::Uninitialized => "uninitialized",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Ready => "ready",
            ConnectionStatus::Error => "error",
            ConnectionStatus::Closed => "closed",
        };
        f.write_str(name)
    }
}

// == Dialer ==
/// Opens a fresh connection to the store. One call is one attempt.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self) -> StoreResult<Arc<dyn KeyValueStore>>;
}

/// Dials Redis at a fixed URI.
pub struct RedisDialer {
    url: String,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl RedisDialer {
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
            command_timeout,
        }
    }
}

#[async_trait]
impl Dialer for RedisDialer {
    async fn dial(&self) -> StoreResult<Arc<dyn KeyValueStore>> {
        let store =
            RedisStore::connect(&self.url, self.connect_timeout, self.command_timeout).await?;
        store.ping().await?;
        Ok(Arc::new(store))
    }
}

/// Hands out the same pre-built store on every dial.
pub struct StaticDialer {
    store: Arc<dyn KeyValueStore>,
}

impl StaticDialer {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Dialer for StaticDialer {
    async fn dial(&self) -> StoreResult<Arc<dyn KeyValueStore>> {
        Ok(Arc::clone(&self.store))
    }
}

// == Lease ==
/// A usable store handle plus the generation of the connection it belongs to.
#[derive(Clone)]
pub struct Lease {
    pub store: Arc<dyn KeyValueStore>,
    pub generation: u64,
}

#[derive(Default)]
struct Slot {
    store: Option<Arc<dyn KeyValueStore>>,
    generation: u64,
}

// == Store Connector ==
/// Supervises the single store connection shared by the process.
///
/// Constructed once by the composition root and injected into the cache
/// service. Status reads never block on I/O.
pub struct StoreConnector {
    dialer: Option<Arc<dyn Dialer>>,
    config: CacheConfig,
    slot: RwLock<Slot>,
    status: watch::Sender<ConnectionStatus>,
    connect_lock: Mutex<()>,
    /// Bumped each time a connect attempt gives up
    failed_attempts: AtomicU64,
    /// Start of the most recent connect attempt
    last_dial: std::sync::Mutex<Option<Instant>>,
    /// Set by `disconnect`; stops background re-dials
    parked: AtomicBool,
}

impl StoreConnector {
    // == Constructors ==
    /// Creates a connector using `dialer`; `None` means caching is disabled.
    pub fn new(dialer: Option<Arc<dyn Dialer>>, config: &CacheConfig) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Uninitialized);
        Self {
            dialer,
            config: config.clone(),
            slot: RwLock::new(Slot::default()),
            status,
            connect_lock: Mutex::new(()),
            failed_attempts: AtomicU64::new(0),
            last_dial: std::sync::Mutex::new(None),
            parked: AtomicBool::new(false),
        }
    }

    /// Builds the connector described by `config`.
    ///
    /// A Redis backend without `REDIS_URL` yields a disabled connector.
    pub fn from_config(config: &CacheConfig) -> Self {
        let dialer: Option<Arc<dyn Dialer>> = match (config.backend, &config.redis_url) {
            (BackendKind::Memory, _) => {
                Some(Arc::new(StaticDialer::new(Arc::new(MemoryStore::new()))))
            }
            (BackendKind::Redis, Some(url)) => Some(Arc::new(RedisDialer::new(
                url.clone(),
                Duration::from_millis(config.connect_timeout_ms),
                Duration::from_millis(config.command_timeout_ms),
            ))),
            (BackendKind::Redis, None) => None,
        };
        Self::new(dialer, config)
    }

    /// A connector that never connects.
    pub fn disabled() -> Self {
        Self::new(None, &CacheConfig::default())
    }

    /// A connector that always dials the given store.
    pub fn with_store(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self::new(Some(Arc::new(StaticDialer::new(store))), config)
    }

    // == Connect ==
    /// Returns the live store handle, dialing it first if needed.
    ///
    /// Concurrent callers queue behind one attempt and share its outcome.
    /// Failures are logged and yield `None`; nothing is thrown.
    pub async fn connect(&self) -> Option<Arc<dyn KeyValueStore>> {
        let Some(dialer) = self.dialer.as_ref() else {
            debug!("Cache store not configured, caching disabled");
            return None;
        };

        let observed = self.failed_attempts.load(Ordering::SeqCst);
        let _guard = self.connect_lock.lock().await;
        if let Some(lease) = self.lease() {
            return Some(lease.store);
        }
        if self.failed_attempts.load(Ordering::SeqCst) != observed {
            debug!("Connect attempt finished while waiting and failed, not redialing");
            return None;
        }

        self.parked.store(false, Ordering::SeqCst);
        self.mark_dial();
        self.set_status(ConnectionStatus::Connecting);
        let attempts = self.config.max_retries.saturating_add(1);
        for attempt in 1..=attempts {
            match dialer.dial().await {
                Ok(store) => {
                    let generation = self.install(Arc::clone(&store));
                    self.set_status(ConnectionStatus::Ready);
                    info!(generation, attempt, "Cache store connected");
                    return Some(store);
                }
                Err(e) if attempt < attempts => {
                    let delay = self.config.retry_delay(attempt);
                    warn!(
                        attempt,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Cache store connect attempt failed"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Cache store unreachable, giving up");
                }
            }
        }

        self.failed_attempts.fetch_add(1, Ordering::SeqCst);
        self.set_status(ConnectionStatus::Error);
        self.teardown();
        None
    }

    // == Background Re-dial ==
    /// Schedules one `connect` on the runtime if the store is configured,
    /// currently `Uninitialized`, and no attempt started within the
    /// reconnect cooldown. Returns whether an attempt was scheduled.
    ///
    /// Never waits on I/O, so the operation guard can call it on its skip path.
    pub fn redial_in_background(self: &Arc<Self>) -> bool {
        if self.dialer.is_none()
            || self.parked.load(Ordering::SeqCst)
            || self.status() != ConnectionStatus::Uninitialized
        {
            return false;
        }

        {
            let mut last = self
                .last_dial
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let cooldown = self.config.reconnect_cooldown();
            if last.is_some_and(|at| at.elapsed() < cooldown) {
                return false;
            }
            *last = Some(Instant::now());
        }

        info!("Re-dialing cache store in background");
        let connector = Arc::clone(self);
        tokio::spawn(async move {
            connector.connect().await;
        });
        true
    }

    // == Availability ==
    /// True only while the connection is `Ready`. Never performs I/O.
    pub fn is_available(&self) -> bool {
        *self.status.borrow() == ConnectionStatus::Ready
            && self
                .slot
                .read()
                .map(|slot| slot.store.is_some())
                .unwrap_or(false)
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Receives every status transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// The live handle, or `None` if the store is not `Ready`.
    pub fn lease(&self) -> Option<Lease> {
        if *self.status.borrow() != ConnectionStatus::Ready {
            return None;
        }
        let slot = self.slot.read().ok()?;
        slot.store.as_ref().map(|store| Lease {
            store: Arc::clone(store),
            generation: slot.generation,
        })
    }

    // == Disconnect ==
    /// Reports that the connection of `generation` dropped.
    ///
    /// Reports for an older generation are ignored so a late failure from a
    /// replaced connection cannot tear down the current one.
    pub fn report_lost(&self, generation: u64) {
        let current = match self.slot.read() {
            Ok(slot) if slot.store.is_some() => slot.generation,
            _ => return,
        };
        if current != generation {
            debug!(generation, current, "Ignoring loss report for stale connection");
            return;
        }
        warn!(generation, "Cache store connection lost");
        self.set_status(ConnectionStatus::Closed);
        self.teardown();
    }

    /// Drops the current handle, leaving the connector `Uninitialized`.
    ///
    /// Background re-dials stay off until the next explicit `connect`.
    pub fn disconnect(&self) {
        self.parked.store(true, Ordering::SeqCst);
        if self.lease().is_some() {
            self.set_status(ConnectionStatus::Closed);
        }
        self.teardown();
    }

    fn mark_dial(&self) {
        let mut last = self
            .last_dial
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Some(Instant::now());
    }

    fn install(&self, store: Arc<dyn KeyValueStore>) -> u64 {
        let mut slot = self.slot.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.generation += 1;
        slot.store = Some(store);
        slot.generation
    }

    fn teardown(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.store = None;
        drop(slot);
        self.set_status(ConnectionStatus::Uninitialized);
    }

    fn set_status(&self, next: ConnectionStatus) {
        let previous = self.status.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Cache store status changed");
        }
    }
}
