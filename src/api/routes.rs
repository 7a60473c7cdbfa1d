//! API Routes
//!
//! Configures the Axum router with all catalog endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    contact, count_products, create_product, get_product, health_handler, list_products,
    metrics_handler, stats_handler, AppState,
};
use crate::metrics::track_http_metrics;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/products` - Paginated, filtered, sorted product list
/// - `POST /api/products` - Create a product (bearer token)
/// - `GET /api/products/count` - Product count, optionally per category
/// - `GET /api/products/:id` - One product
/// - `POST /api/contact` - Contact form submission
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
/// - `GET /metrics` - Prometheus exposition, when a recorder is attached
///
/// # Middleware
/// - Metrics: Request count and duration per method, route and status
/// - CORS: Allows any origin, and exposes the rate-limit and cache headers
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/count", get(count_products))
        .route("/api/products/:id", get(get_product))
        .route("/api/contact", post(contact))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(track_http_metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
