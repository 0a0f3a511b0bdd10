//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! [`ChannelError`] covers the outbound-channel failure modes; at relay
//! call sites both are reported as an unreachable peer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::DeviceId;

/// Failure modes of a per-connection outbound channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The channel was closed; the connection is gone.
    #[error("channel closed")]
    Closed,

    /// The bounded buffer is full; the consumer is not keeping up.
    #[error("channel buffer full")]
    Overflow,
}

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "device offline: D-42",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges below).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status                |
/// |-----------|-------------------|----------------------------|
/// | 1000–1999 | Validation        | 400 Bad Request            |
/// | 2000–2999 | Not Found/Access  | 404 Not Found / 403 Forbidden |
/// | 3000–3999 | Server            | 500 Internal Server Error  |
/// | 4000–4999 | Relay             | 503 Service Unavailable    |
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Inbound frame could not be parsed; the frame is dropped.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Connection handshake was refused before registration.
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    /// The trusted identity header is missing from the request.
    #[error("missing user identity header")]
    MissingIdentity,

    /// No device record with the given id.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// No backed-up account record with the given id.
    #[error("backed-up account not found: {0}")]
    AccountNotFound(String),

    /// The caller does not own the requested resource.
    #[error("access denied")]
    AccessDenied,

    /// The device has no live connection; the command was not delivered.
    #[error("device offline: {0}")]
    DeviceOffline(DeviceId),

    /// The peer's outbound channel rejected the frame.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MalformedFrame(_) => 1002,
            Self::HandshakeRejected(_) => 1003,
            Self::MissingIdentity => 1004,
            Self::DeviceNotFound(_) => 2001,
            Self::AccountNotFound(_) => 2002,
            Self::AccessDenied => 2003,
            Self::PersistenceError(_) => 3001,
            Self::Internal(_) => 3000,
            Self::DeviceOffline(_) => 4001,
            Self::Channel(_) => 4002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::MalformedFrame(_) | Self::HandshakeRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MissingIdentity => StatusCode::UNAUTHORIZED,
            Self::DeviceNotFound(_) | Self::AccountNotFound(_) => StatusCode::NOT_FOUND,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DeviceOffline(_) | Self::Channel(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn device_offline_maps_to_service_unavailable() {
        let err = GatewayError::DeviceOffline(DeviceId::new("D1"));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), 4001);
    }

    #[test]
    fn channel_error_converts_and_maps() {
        let err = GatewayError::from(ChannelError::Overflow);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn not_found_variants_map_to_404() {
        assert_eq!(
            GatewayError::DeviceNotFound("D1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::AccountNotFound("A1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
