//! Rollcall API — error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rollcall_core::envelope::ErrorEnvelope;
use rollcall_core::error::CoreError;
use serde_json::json;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Request-level failures, rendered as the failure envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The `timezone` query parameter is not a known IANA zone.
    #[error("'{0}' is not a valid IANA timezone (ex: 'Europe/Madrid')")]
    InvalidTimezone(String),

    /// Anything the caller cannot fix.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTimezone(tz) => Self::InvalidTimezone(tz),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, envelope) = match self {
            Self::InvalidTimezone(value) => (
                StatusCode::BAD_REQUEST,
                ErrorEnvelope::new(message)
                    .with_details(json!({ "field": "timezone", "value": value })),
            ),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorEnvelope::new(message),
            ),
        };

        (status, Json(envelope)).into_response()
    }
}
