//! API Module
//!
//! HTTP handlers and routing for the catalog REST API.
//!
//! # Endpoints
//! - `GET|POST /api/products` - List or create products
//! - `GET /api/products/count` - Count products
//! - `GET /api/products/:id` - Fetch one product
//! - `POST /api/contact` - Contact form
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint
//! - `GET /metrics` - Prometheus metrics

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
