//! Error types for the catalog cache service
//!
//! Store failures (`StoreError`) never reach an HTTP caller: the store adapter
//! collapses them to sentinel values and the rate limiter middleware fails open.
//! `AppError` is what handlers return.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Store Error Enum ==
/// Failure of a single backing-store operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No backend configured (missing or invalid credentials)
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Transport-level failure; the connection is dropped and rebuilt lazily
    #[error("connection error: {0}")]
    Connection(String),

    /// The store rejected or failed the command
    #[error("command failed: {0}")]
    Command(String),

    /// Value could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for backing-store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Rate Limit Error ==
/// The limiter could not reach a decision.
#[derive(Error, Debug)]
pub enum RateLimitError {
    #[error("rate limiter store failure: {0}")]
    Store(#[from] StoreError),
}

// == App Error Enum ==
/// Unified error type for HTTP handlers.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed query, body or parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or wrong credentials for a write
    #[error("Unauthorized")]
    Unauthorized,

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Data layer or other internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let AppError::Internal(msg) = &self {
            tracing::error!("Request failed: {}", msg);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for handlers and the data layer.
pub type Result<T> = std::result::Result<T, AppError>;
