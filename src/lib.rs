//! Catalog Cache - read-through caching and rate limiting for a product catalog
//!
//! Cache-aside reads, pattern invalidation on writes and sliding-window rate
//! limits, all on top of an optional key-value store that the service can
//! run without.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod ratelimit;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::{Config, StoreBackend};
pub use crate::metrics::init_metrics;
pub use tasks::spawn_cleanup_task;
