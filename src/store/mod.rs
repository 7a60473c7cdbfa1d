//! Store Module
//!
//! Backing key-value stores and the adapter that isolates the rest of the
//! service from their transport and failure modes.
//!
//! # Backends
//! - [`RedisStore`] - remote Redis-protocol store
//! - [`MemoryStore`] - in-process store for local runs and tests

mod client;
mod entry;
mod memory;
mod redis_store;

use async_trait::async_trait;

use crate::error::StoreResult;

pub use client::{Availability, StoreClient};
pub use entry::{StoredValue, WindowLog};
pub use memory::{glob_match, MemoryStore};
pub use redis_store::RedisStore;

// == Window Count ==
/// Outcome of one atomic sliding-window admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Whether this attempt was counted
    pub admitted: bool,
    /// Admissions inside the window after this attempt
    pub count: u64,
    /// Timestamp (Unix ms) of the oldest admission still in the window
    pub oldest_ms: u64,
}

// == Key Value Store Trait ==
/// Operations a backing store must provide.
///
/// Every method reports failures as `StoreError`; turning them into sentinel
/// values is the job of [`StoreClient`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, expiring after `ttl_secs`.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()>;

    /// Returns whether a key was removed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Removes every key matching a glob pattern, returning how many went.
    async fn delete_matching(&self, pattern: &str) -> StoreResult<usize>;

    /// Counts one request for `key` if fewer than `limit` were admitted in
    /// the `window_ms` ending at `now_ms`. Check and increment are one atomic
    /// step in the backend.
    async fn sliding_window(
        &self,
        key: &str,
        limit: u64,
        window_ms: u64,
        now_ms: u64,
    ) -> StoreResult<WindowCount>;
}
