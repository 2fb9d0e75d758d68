//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to an HTTP status code and a structured JSON error response.
//!
//! Authentication failures deliberately collapse into a single opaque
//! variant: a malformed token, a bad signature, and an expired token all
//! surface as the same generic `unauthorized` outcome so callers cannot
//! probe which check failed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 403,
///     "message": "forbidden: trabajador_id does not match the authenticated subject"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code, mirrors the HTTP status.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing, malformed, tampered, or expired token. Never carries a
    /// reason; the caller only learns that authentication failed.
    #[error("unauthorized")]
    Authentication,

    /// Valid token but insufficient role or identity mismatch.
    #[error("forbidden: {0}")]
    Authorization(String),

    /// Malformed request shape.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A registry or entity-store call failed.
    #[error("dependency failure: {0}")]
    Dependency(String),

    /// Startup-time configuration problem; always fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Dependency(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the message safe to expose to the caller.
    ///
    /// Authentication and internal faults are reduced to a fixed string;
    /// details stay in the server logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Authentication => "unauthorized".to_string(),
            Self::Authorization(_) | Self::Validation(_) => self.to_string(),
            Self::Dependency(_) | Self::Config(_) | Self::Internal(_) => {
                "internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: status.as_u16(),
                message: self.public_message(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
