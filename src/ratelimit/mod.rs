//! Rate Limit Module
//!
//! Sliding-window admission control per client, separately configured per
//! operation class, plus the adapter that applies it to one HTTP request.

mod identifier;
mod limiter;
mod middleware;

pub use identifier::{client_ip, get_identifier};
pub use limiter::{RateLimitResult, RateLimiter, RateLimiters, DEFAULT_WINDOW};
pub use middleware::{
    apply_rate_limit_headers, rate_limit_headers, rejection_response, retry_after_secs,
    with_rate_limit, RateLimitOutcome, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING,
    X_RATELIMIT_RESET,
};
