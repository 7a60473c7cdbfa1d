//! Cache Service Module
//!
//! Cache-aside reads and writes on top of [`StoreClient`]. Nothing here
//! fails because of the store: a broken store is indistinguishable from a
//! cold cache. Fetcher errors are the only errors that come out.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{keys, CacheStats, CacheStatsSnapshot};
use crate::metrics;
use crate::store::StoreClient;

// == Cache Options ==
/// Per-call overrides for TTL and namespace.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// TTL in seconds; the service default applies when unset
    pub ttl: Option<u64>,
    /// Namespace prefix; the service prefix applies when unset
    pub prefix: Option<String>,
}

impl CacheOptions {
    pub fn ttl(secs: u64) -> Self {
        Self {
            ttl: Some(secs),
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

// == Cached ==
/// A value plus whether it came from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub data: T,
    pub cached: bool,
}

// == Cache Service ==
pub struct CacheService {
    store: Arc<StoreClient>,
    prefix: String,
    default_ttl: u64,
    stats: CacheStats,
}

impl CacheService {
    /// TTL used when neither the call nor the configuration sets one
    pub const DEFAULT_TTL: u64 = 60;

    /// Namespace used when the configuration sets none
    pub const DEFAULT_PREFIX: &'static str = "catalog:";

    // == Constructor ==
    pub fn new(store: Arc<StoreClient>, prefix: impl Into<String>, default_ttl: u64) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            default_ttl,
            stats: CacheStats::new(),
        }
    }

    /// Service with the default namespace and TTL.
    pub fn with_defaults(store: Arc<StoreClient>) -> Self {
        Self::new(store, Self::DEFAULT_PREFIX, Self::DEFAULT_TTL)
    }

    /// Namespaced key. The prefix is glob-escaped so it never widens an
    /// invalidation pattern; plain prefixes such as `catalog:` are unchanged.
    fn full_key(&self, key: &str, options: &CacheOptions) -> String {
        let prefix = options.prefix.as_deref().unwrap_or(&self.prefix);
        format!("{}{}", keys::escape_glob(prefix), key)
    }

    // == Get ==
    /// Cached value for `key`, or `None` on miss, store failure or an entry
    /// that no longer decodes as `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, options: &CacheOptions) -> Option<T> {
        let full_key = self.full_key(key, options);
        let raw = self.store.get(&full_key).await?;

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = %full_key, "Discarding undecodable cache entry: {}", err);
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key`. Returns `false` if it was not stored.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, options: &CacheOptions) -> bool {
        let full_key = self.full_key(key, options);
        let ttl = options.ttl.unwrap_or(self.default_ttl);

        let stored = match serde_json::to_string(value) {
            Ok(raw) => self.store.set(&full_key, &raw, ttl).await,
            Err(err) => {
                warn!(key = %full_key, "Cannot serialize cache value: {}", err);
                false
            }
        };

        self.stats.record_write(stored);
        stored
    }

    // == Invalidate ==
    pub async fn invalidate(&self, key: &str, options: &CacheOptions) -> bool {
        let full_key = self.full_key(key, options);
        let removed = self.store.delete(&full_key).await;
        if removed {
            self.stats.record_invalidations(1);
        }
        removed
    }

    // == With Cache ==
    /// Returns the cached value for `key`, or runs `fetcher`, stores its
    /// result and returns it.
    ///
    /// Concurrent misses on one key each run the fetcher; the last write wins.
    /// A failed store write does not affect the returned data. Fetcher errors
    /// propagate unchanged and nothing is cached for them.
    pub async fn with_cache<T, E, F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        options: &CacheOptions,
    ) -> Result<Cached<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(data) = self.get::<T>(key, options).await {
            debug!(key, "Cache hit");
            self.stats.record_hit();
            metrics::record_cache_lookup(true);
            return Ok(Cached { data, cached: true });
        }

        debug!(key, "Cache miss");
        self.stats.record_miss();
        metrics::record_cache_lookup(false);

        let data = fetcher().await?;
        if !self.set(key, &data, options).await {
            debug!(key, "Fetched value was not cached");
        }

        Ok(Cached {
            data,
            cached: false,
        })
    }

    // == Invalidate Pattern ==
    /// Removes every key under the namespace matching a glob `pattern`.
    ///
    /// Best effort: returns how many keys went, 0 when the store cannot
    /// scan or is down. Short TTLs bound the staleness either way.
    pub async fn invalidate_pattern(&self, pattern: &str, options: &CacheOptions) -> usize {
        let full_pattern = self.full_key(pattern, options);
        let removed = self.store.delete_matching(&full_pattern).await;

        info!("Invalidated {} cache entries matching {}", removed, full_pattern);
        self.stats.record_invalidations(removed as u64);
        removed
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn store(&self) -> &Arc<StoreClient> {
        &self.store
    }
}
