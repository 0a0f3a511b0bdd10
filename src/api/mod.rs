//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api/v1`; system endpoints
//! live at the root. User identity comes from the trusted `X-User-Name`
//! header stamped by the upstream gateway.

pub mod dto;
pub mod handlers;

use axum::Router;
use axum::http::HeaderMap;

use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::GatewayError;
use crate::ws::handler::USER_ID_HEADER;

/// Extracts the calling user from the trusted identity header.
///
/// # Errors
///
/// Returns [`GatewayError::MissingIdentity`] when the header is absent
/// or empty.
pub fn require_user(headers: &HeaderMap) -> Result<UserId, GatewayError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(UserId::new)
        .ok_or(GatewayError::MissingIdentity)
}

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
