//! Store Client Module
//!
//! Process-wide adapter around the optional backing store. Built once at
//! startup and shared as `Arc<StoreClient>` by the cache service and the rate
//! limiters.
//!
//! Cache-facing methods are total: every failure collapses to `None`, `false`
//! or `0` after being logged, so a broken store only ever means "cache miss".
//! Availability is advisory state: it is updated after every call but never
//! consulted to skip one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, StoreResult};
use crate::store::{KeyValueStore, RedisStore, WindowCount};

// == Availability ==
/// Snapshot of the adapter's connectivity state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub backend: &'static str,
    pub is_available: bool,
    pub last_error: Option<String>,
}

// == Store Client ==
pub struct StoreClient {
    backend: Option<Arc<dyn KeyValueStore>>,
    clock: Arc<dyn Clock>,
    available: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl StoreClient {
    // == Initialize ==
    /// Connects to the remote store described by `url` and `token`.
    ///
    /// Missing or invalid credentials leave the client in degraded mode
    /// (caching and rate limiting disabled) instead of failing startup.
    pub fn initialize(url: Option<&str>, token: Option<&str>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let Some(url) = url.filter(|u| !u.is_empty()) else {
            warn!("Store credentials not found, caching and rate limiting disabled");
            return Self::disabled(clock, None);
        };

        match RedisStore::open(url, token) {
            Ok(store) => {
                info!("Store client initialized");
                Self::with_backend(Arc::new(store), clock)
            }
            Err(err) => {
                warn!("Store initialization failed, running without cache: {}", err);
                Self::disabled(clock, Some(err.to_string()))
            }
        }
    }

    /// Wraps an already-built backend.
    pub fn with_backend(backend: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend: Some(backend),
            clock,
            available: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// A client with no backend: every read misses, every write fails.
    pub fn disabled(clock: Arc<dyn Clock>, reason: Option<String>) -> Self {
        Self {
            backend: None,
            clock,
            available: AtomicBool::new(false),
            last_error: RwLock::new(reason),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    // == Get ==
    /// Returns the stored value, or `None` when absent or on any failure.
    pub async fn get(&self, key: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        let result = backend.get(key).await;
        self.settle("get", key, result).flatten()
    }

    // == Set ==
    /// Stores `value` with a TTL. Returns `false` on any failure.
    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        let result = backend.set_ex(key, value, ttl_secs).await;
        self.settle("set", key, result).is_some()
    }

    // == Delete ==
    /// Removes `key`. Returns `false` when the store is unavailable or errors.
    pub async fn delete(&self, key: &str) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        let result = backend.delete(key).await;
        self.settle("delete", key, result).is_some()
    }

    // == Delete Matching ==
    /// Best-effort pattern removal; `0` when unsupported or failing.
    pub async fn delete_matching(&self, pattern: &str) -> usize {
        let Some(backend) = self.backend.as_ref() else {
            return 0;
        };
        let result = backend.delete_matching(pattern).await;
        self.settle("delete_matching", pattern, result).unwrap_or(0)
    }

    // == Sliding Window ==
    /// Atomic admission check. Unlike the cache-facing methods this surfaces
    /// the failure so the limiter can decide how to fail.
    pub async fn sliding_window(
        &self,
        key: &str,
        limit: u64,
        window_ms: u64,
    ) -> StoreResult<WindowCount> {
        let Some(backend) = self.backend.as_ref() else {
            return Err(StoreError::Unavailable("no store configured".to_string()));
        };
        let now = self.clock.now_ms();
        let result = backend.sliding_window(key, limit, window_ms, now).await;
        match &result {
            Ok(_) => self.mark_available(),
            Err(err) => self.record_failure("sliding_window", key, err),
        }
        result
    }

    // == Availability ==
    pub fn availability(&self) -> Availability {
        Availability {
            backend: self.backend.as_ref().map_or("none", |b| b.name()),
            is_available: self.available.load(Ordering::Relaxed),
            last_error: self.last_error.read().ok().and_then(|e| e.clone()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Collapses a store result to `Option`, updating availability.
    fn settle<T>(&self, op: &str, key: &str, result: StoreResult<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.mark_available();
                Some(value)
            }
            Err(err) => {
                self.record_failure(op, key, &err);
                None
            }
        }
    }

    fn mark_available(&self) {
        if !self.available.swap(true, Ordering::Relaxed) {
            info!("Store connection recovered");
        }
    }

    fn record_failure(&self, op: &str, key: &str, err: &StoreError) {
        warn!(op, key, "Store operation failed: {}", err);
        self.available.store(false, Ordering::Relaxed);
        match self.last_error.write() {
            Ok(mut last) => *last = Some(err.to_string()),
            Err(_) => debug!("Availability state lock poisoned"),
        }
    }
}
