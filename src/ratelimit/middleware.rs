//! Rate Limit Middleware Adapter
//!
//! Binds a [`RateLimiter`] to one request: admitted requests carry
//! informational headers into their response, rejected ones get a finished
//! 429 response, and limiter failures let the request through.
//!
//! Handlers must check the outcome first and return the rejection verbatim.

use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::SecondsFormat;
use tracing::{error, warn};

use crate::metrics;
use crate::models::RateLimitExceededResponse;
use crate::ratelimit::{get_identifier, RateLimitResult, RateLimiter};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

// == Outcome ==
#[derive(Debug)]
pub enum RateLimitOutcome {
    /// Proceed. Headers are absent when the limiter failed open.
    Admitted(Option<HeaderMap>),
    /// Stop and return this 429 response.
    Rejected(Response),
}

impl RateLimitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RateLimitOutcome::Admitted(_))
    }
}

// == With Rate Limit ==
/// Runs `limiter` for the client behind `headers`.
pub async fn with_rate_limit(headers: &HeaderMap, limiter: &RateLimiter) -> RateLimitOutcome {
    let identifier = get_identifier(headers);

    match limiter.limit(&identifier).await {
        Ok(result) if result.success => RateLimitOutcome::Admitted(Some(rate_limit_headers(&result))),
        Ok(result) => {
            warn!(
                identifier = %identifier,
                limiter = limiter.prefix(),
                "Rate limit exceeded"
            );
            metrics::record_rate_limit_rejection(limiter.prefix());
            RateLimitOutcome::Rejected(rejection_response(&result, limiter.now_ms()))
        }
        Err(err) => {
            // fail open
            error!("Rate limiting error, allowing request: {}", err);
            metrics::record_rate_limit_failure(limiter.prefix());
            RateLimitOutcome::Admitted(None)
        }
    }
}

// == Headers ==
/// `X-RateLimit-*` headers for a decision. Reset is Unix milliseconds.
pub fn rate_limit_headers(result: &RateLimitResult) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(result.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(result.remaining));
    headers.insert(
        X_RATELIMIT_RESET,
        HeaderValue::from(result.reset.timestamp_millis()),
    );
    headers
}

/// Copies rate-limit headers (if any) onto a response.
pub fn apply_rate_limit_headers(response: &mut Response, headers: Option<HeaderMap>) {
    if let Some(headers) = headers {
        response.headers_mut().extend(headers);
    }
}

/// Whole seconds until `reset`, rounded up, never negative.
pub fn retry_after_secs(result: &RateLimitResult, now_ms: u64) -> u64 {
    let reset_ms = result.reset.timestamp_millis().max(0) as u64;
    reset_ms.saturating_sub(now_ms).div_ceil(1000)
}

// == Rejection ==
/// The 429 response for a rejected decision.
pub fn rejection_response(result: &RateLimitResult, now_ms: u64) -> Response {
    let wait = retry_after_secs(result, now_ms);
    let body = RateLimitExceededResponse {
        error: "Rate limit exceeded".to_string(),
        message: format!("Too many requests. Try again in {} seconds.", wait),
        limit: result.limit,
        remaining: result.remaining,
        reset: result.reset.to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let mut headers = rate_limit_headers(result);
    headers.insert(axum::http::header::RETRY_AFTER, HeaderValue::from(wait));

    (StatusCode::TOO_MANY_REQUESTS, headers, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{to_datetime, Clock, ManualClock};
    use crate::ratelimit::DEFAULT_WINDOW;
    use crate::store::{MemoryStore, StoreClient};
    use std::sync::Arc;

    fn limiter(max: u64, clock: &ManualClock) -> RateLimiter {
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let store = StoreClient::with_backend(Arc::new(MemoryStore::new(shared.clone())), shared);
        RateLimiter::new(Arc::new(store), "rl:test", max, DEFAULT_WINDOW)
    }

    fn client_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        headers.insert("user-agent", HeaderValue::from_static("Mozilla"));
        headers
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_admitted_carries_headers() {
        let clock = ManualClock::new(1_000_000);
        let limiter = limiter(3, &clock);

        let outcome = with_rate_limit(&client_headers(), &limiter).await;

        let RateLimitOutcome::Admitted(Some(headers)) = outcome else {
            panic!("expected admission with headers");
        };
        assert_eq!(headers["x-ratelimit-limit"], "3");
        assert_eq!(headers["x-ratelimit-remaining"], "2");
        assert_eq!(headers["x-ratelimit-reset"], "1060000");
    }

    #[tokio::test]
    async fn test_rejected_is_429_with_future_reset() {
        let clock = ManualClock::starting_now();
        let limiter = limiter(1, &clock);
        let headers = client_headers();

        assert!(with_rate_limit(&headers, &limiter).await.is_success());
        clock.advance(std::time::Duration::from_millis(1_500));

        let RateLimitOutcome::Rejected(response) = with_rate_limit(&headers, &limiter).await else {
            panic!("expected rejection");
        };

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert_eq!(response.headers()["retry-after"], "59");

        let json = body_json(response).await;
        assert_eq!(json["error"], "Rate limit exceeded");
        assert_eq!(json["limit"], 1);
        assert_eq!(json["remaining"], 0);
        assert!(json["message"].as_str().unwrap().contains("59 seconds"));

        let reset = chrono::DateTime::parse_from_rfc3339(json["reset"].as_str().unwrap()).unwrap();
        assert!(reset.timestamp_millis() as u64 > clock.now_ms());
    }

    #[tokio::test]
    async fn test_fails_open_without_store() {
        let limiter = RateLimiter::new(
            Arc::new(StoreClient::initialize(None, None)),
            "rl:test",
            1,
            DEFAULT_WINDOW,
        );

        for _ in 0..3 {
            let outcome = with_rate_limit(&client_headers(), &limiter).await;
            assert!(matches!(outcome, RateLimitOutcome::Admitted(None)));
        }
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let result = RateLimitResult {
            success: false,
            limit: 5,
            remaining: 0,
            reset: to_datetime(10_001),
        };
        assert_eq!(retry_after_secs(&result, 0), 11);
        assert_eq!(retry_after_secs(&result, 10_001), 0);
        assert_eq!(retry_after_secs(&result, 20_000), 0);
    }

    #[test]
    fn test_apply_headers() {
        let mut response = StatusCode::OK.into_response();
        let mut extra = HeaderMap::new();
        extra.insert(X_RATELIMIT_LIMIT, HeaderValue::from(10u64));

        apply_rate_limit_headers(&mut response, Some(extra));
        apply_rate_limit_headers(&mut response, None);

        assert_eq!(response.headers()["x-ratelimit-limit"], "10");
    }
}
