//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`AaApiError`] from aa-client to HTTP status codes and returns a
//! JSON body with error code, message, and details.
//!
//! Upstream rejections are answered with 502 and carry the AA's status and
//! raw body in `details`, so the caller sees exactly what the AA said.
//! Configuration failures are logged and answered with a generic 500.

use aa_client::{AaApiError, ErrorKind};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "UPSTREAM_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Upstream status and body for 502 responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict with current session state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal or configuration error (500). Message is logged but not
    /// returned to the client.
    #[error("internal error: {0}")]
    Internal(String),

    /// The AA API rejected the call or could not be reached (502).
    #[error("upstream AA API error: {message}")]
    Upstream {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Upstream {
                status: Some(status),
                body,
                ..
            } => Some(serde_json::json!({
                "upstreamStatus": status,
                "upstreamBody": body,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Upstream { message, .. } => message.clone(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Upstream { status, .. } => {
                tracing::warn!(error = %self, upstream_status = ?status, "upstream AA API error")
            }
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AaApiError> for AppError {
    fn from(err: AaApiError) -> Self {
        match err.kind() {
            ErrorKind::Upstream => Self::Upstream {
                status: err.upstream_status(),
                body: err.upstream_body().map(str::to_string),
                message: err.to_string(),
            },
            ErrorKind::Config => Self::Internal(err.to_string()),
            ErrorKind::NotFound => match err {
                AaApiError::SessionMismatch { .. } => Self::Conflict(err.to_string()),
                other => Self::NotFound(other.to_string()),
            },
        }
    }
}
