//! Response DTOs for the catalog API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::{Deserialize, Serialize};

use crate::cache::CacheStatsSnapshot;
use crate::store::Availability;

/// Body of every 429 rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitExceededResponse {
    pub error: String,
    /// Human-readable retry hint
    pub message: String,
    pub limit: u64,
    pub remaining: u64,
    /// ISO-8601 instant the window frees a slot
    pub reset: String,
}

/// Response body for `GET /api/products/count`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountResponse {
    pub category: Option<String>,
    pub count: u64,
}

/// Response body for `POST /api/contact`
#[derive(Debug, Clone, Serialize)]
pub struct ContactResponse {
    pub success: bool,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counters: CacheStatsSnapshot,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub store: Availability,
}

impl StatsResponse {
    pub fn new(counters: CacheStatsSnapshot, store: Availability) -> Self {
        Self {
            hit_rate: counters.hit_rate(),
            counters,
            store,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" while the store is unreachable
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub store: Availability,
}

impl HealthResponse {
    /// Creates a HealthResponse with current timestamp
    pub fn from_availability(store: Availability) -> Self {
        let status = if store.is_available { "healthy" } else { "degraded" };
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn availability(is_available: bool) -> Availability {
        Availability {
            backend: "memory",
            is_available,
            last_error: None,
        }
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let counters = CacheStatsSnapshot {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        let resp = StatsResponse::new(counters, availability(true));
        assert!((resp.hit_rate - 0.8).abs() < 0.001);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["hits"], 80);
        assert_eq!(json["failedWrites"], 0);
        assert_eq!(json["store"]["isAvailable"], true);
    }

    #[test]
    fn test_health_status_follows_store() {
        assert_eq!(HealthResponse::from_availability(availability(true)).status, "healthy");
        assert_eq!(HealthResponse::from_availability(availability(false)).status, "degraded");
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::from_availability(availability(true));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
