//! Sliding-Window Rate Limiter
//!
//! Admission control per client identifier. Each limiter owns a fixed limit
//! and window; the check-and-count step runs atomically inside the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock::to_datetime;
use crate::error::RateLimitError;
use crate::store::StoreClient;

/// Window shared by every operation class.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

// == Rate Limit Result ==
/// Point-in-time admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub success: bool,
    /// Configured requests per window
    pub limit: u64,
    /// Admissions left in the current window
    pub remaining: u64,
    /// When the oldest counted request leaves the window
    pub reset: DateTime<Utc>,
}

// == Rate Limiter ==
pub struct RateLimiter {
    store: Arc<StoreClient>,
    prefix: String,
    max_requests: u64,
    window: Duration,
}

impl RateLimiter {
    // == Constructor ==
    pub fn new(
        store: Arc<StoreClient>,
        prefix: impl Into<String>,
        max_requests: u64,
        window: Duration,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Current time on the limiter's clock, in Unix milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.store.now_ms()
    }

    // == Limit ==
    /// Counts one request for `identifier` and reports whether it is admitted.
    ///
    /// Errors only when the store cannot be reached; callers decide how to
    /// fail.
    pub async fn limit(&self, identifier: &str) -> Result<RateLimitResult, RateLimitError> {
        let key = format!("{}:{}", self.prefix, identifier);
        let window_ms = self.window.as_millis() as u64;

        let hit = self
            .store
            .sliding_window(&key, self.max_requests, window_ms)
            .await?;

        let result = RateLimitResult {
            success: hit.admitted,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(hit.count),
            reset: to_datetime(hit.oldest_ms.saturating_add(window_ms)),
        };

        debug!(
            identifier,
            prefix = %self.prefix,
            success = result.success,
            remaining = result.remaining,
            "Rate limit checked"
        );
        Ok(result)
    }
}

// == Rate Limiters ==
/// One limiter per operation class.
pub struct RateLimiters {
    /// Catalog reads, 100/min
    pub read: RateLimiter,
    /// Catalog writes, 10/min
    pub write: RateLimiter,
    /// Other API calls, 50/min
    pub general: RateLimiter,
    /// Contact form submissions, 5/min
    pub contact: RateLimiter,
}

impl RateLimiters {
    pub const READ_LIMIT: u64 = 100;
    pub const WRITE_LIMIT: u64 = 10;
    pub const GENERAL_LIMIT: u64 = 50;
    pub const CONTACT_LIMIT: u64 = 5;

    /// Builds the four limiters under `{namespace}rl:{class}`.
    pub fn new(store: Arc<StoreClient>, namespace: &str) -> Self {
        let limiter = |class: &str, max: u64| {
            RateLimiter::new(
                store.clone(),
                format!("{}rl:{}", namespace, class),
                max,
                DEFAULT_WINDOW,
            )
        };

        Self {
            read: limiter("read", Self::READ_LIMIT),
            write: limiter("write", Self::WRITE_LIMIT),
            general: limiter("general", Self::GENERAL_LIMIT),
            contact: limiter("contact", Self::CONTACT_LIMIT),
        }
    }
}
