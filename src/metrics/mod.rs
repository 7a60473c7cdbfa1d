//! Metrics Module
//!
//! Prometheus metrics: an HTTP duration histogram recorded by middleware,
//! and counters for cache lookups and rate-limit decisions. The macros are
//! no-ops until [`init_metrics`] installs the recorder.

mod http;
mod setup;

use metrics::counter;

pub use http::track_http_metrics;
pub use setup::init_metrics;

pub const HTTP_REQUESTS_TOTAL: &str = "catalog_http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "catalog_http_request_duration_seconds";
pub const CACHE_HITS_TOTAL: &str = "catalog_cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "catalog_cache_misses_total";
pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "catalog_rate_limit_rejections_total";
pub const RATE_LIMIT_FAILURES_TOTAL: &str = "catalog_rate_limit_failures_total";

/// Counts one cache lookup.
pub fn record_cache_lookup(hit: bool) {
    if hit {
        counter!(CACHE_HITS_TOTAL).increment(1);
    } else {
        counter!(CACHE_MISSES_TOTAL).increment(1);
    }
}

/// Counts one request turned away by `limiter`.
pub fn record_rate_limit_rejection(limiter: &str) {
    counter!(RATE_LIMIT_REJECTIONS_TOTAL, "limiter" => limiter.to_string()).increment(1);
}

/// Counts one request let through because `limiter` could not decide.
pub fn record_rate_limit_failure(limiter: &str) {
    counter!(RATE_LIMIT_FAILURES_TOTAL, "limiter" => limiter.to_string()).increment(1);
}
