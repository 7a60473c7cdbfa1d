//! Metrics setup and initialization.

use std::sync::Mutex;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

use super::{
    CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
    RATE_LIMIT_FAILURES_TOTAL, RATE_LIMIT_REJECTIONS_TOTAL,
};

/// Histogram buckets in seconds, 0.5ms to 10s.
const DURATION_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// The process holds one global recorder.
static INSTALLED: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Installs the Prometheus recorder and returns the handle `/metrics`
/// renders from. Later calls return the same handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let mut installed = INSTALLED.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(handle) = installed.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(DURATION_BUCKETS)?
        .install_recorder()?;
    describe_metrics();

    info!("Metrics recorder installed");
    *installed = Some(handle.clone());
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests");
    metrics::describe_histogram!(
        HTTP_REQUEST_DURATION,
        metrics::Unit::Seconds,
        "HTTP request duration in seconds"
    );
    metrics::describe_counter!(CACHE_HITS_TOTAL, "Cache lookups served from the store");
    metrics::describe_counter!(CACHE_MISSES_TOTAL, "Cache lookups that ran the fetcher");
    metrics::describe_counter!(
        RATE_LIMIT_REJECTIONS_TOTAL,
        "Requests rejected by a rate limiter"
    );
    metrics::describe_counter!(
        RATE_LIMIT_FAILURES_TOTAL,
        "Requests admitted because the rate limiter failed"
    );
}
