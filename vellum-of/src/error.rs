//! Error types for vellum-of
//!
//! Maps adapter and pipeline failures onto HTTP responses with a JSON
//! error body: `{"error": {"code", "message"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::order_store::StoreError;
use crate::services::fulfillment::FulfillmentError;
use crate::services::provider::ProviderError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., a generation is already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream content provider failed (502)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Order store refused a write in degraded mode (503)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// vellum-common error
    #[error("Common error: {0}")]
    Common(#[from] vellum_common::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(format!("order {}", id)),
            StoreError::Duplicate(id) => {
                ApiError::Conflict(format!("order {} already exists", id))
            }
            StoreError::NotConfigured(op) => {
                ApiError::StoreUnavailable(format!("order store cannot {}", op))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        ApiError::Provider(err.to_string())
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        match err {
            FulfillmentError::InvalidState {
                order_id,
                status,
                expected,
            } => ApiError::Conflict(format!(
                "order {} is {}, expected {}",
                order_id,
                status.as_str(),
                expected
            )),
            FulfillmentError::MissingDraft(id) => {
                ApiError::Conflict(format!("order {} has no stored draft to resume", id))
            }
            FulfillmentError::Provider(e) => e.into(),
            FulfillmentError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Provider(msg) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", msg),
            ApiError::StoreUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
