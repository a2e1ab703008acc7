//! Video broker error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. The four
//! domain kinds stay distinct all the way to the boundary so a misconfigured
//! broker (500) can be told apart from an unreachable provider (502).
//!
//! Failures are logged once, where they happen, by the service layer. This
//! module only renders them; messages for server-side failures are generic.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Video broker error type.
///
/// Maps to HTTP status codes:
/// - Configuration, Internal: 500 Internal Server Error
/// - InvalidArgument: 400 Bad Request
/// - NotFound: 404 Not Found
/// - Upstream: 502 Bad Gateway
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl BrokerError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            BrokerError::Configuration(_) | BrokerError::Internal => 500,
            BrokerError::InvalidArgument(_) => 400,
            BrokerError::Upstream(_) => 502,
            BrokerError::NotFound(_) => 404,
        }
    }

    /// Short, bounded label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            BrokerError::Configuration(_) => "configuration",
            BrokerError::InvalidArgument(_) => "invalid_argument",
            BrokerError::Upstream(_) => "upstream",
            BrokerError::NotFound(_) => "not_found",
            BrokerError::Internal => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            BrokerError::Configuration(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                "The video service is not configured".to_string(),
            ),
            BrokerError::InvalidArgument(reason) => (
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                reason.clone(),
            ),
            BrokerError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "The video platform request failed".to_string(),
            ),
            BrokerError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
            BrokerError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
