//! Cache Module
//!
//! Cache-aside service, cache key registry and counters.

pub mod keys;
mod service;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use keys::ttl;
pub use service::{CacheOptions, CacheService, Cached};
pub use stats::{CacheStats, CacheStatsSnapshot};
