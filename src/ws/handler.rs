//! Axum WebSocket upgrade handlers for devices and browser clients.
//!
//! Identity is carried out-of-band at connect time: devices put their id
//! in the query string, and the upstream gateway stamps the authenticated
//! user on the `X-User-Name` header. A handshake missing either is
//! refused before anything is registered.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::connection::{run_browser_connection, run_device_connection};
use crate::app_state::AppState;
use crate::domain::{DeviceId, UserId};
use crate::error::GatewayError;
use crate::service::DeviceConnectInfo;

/// Trusted header carrying the authenticated user id, set by the
/// upstream gateway. The relay never authenticates it.
pub const USER_ID_HEADER: &str = "x-user-name";

/// Query parameters of the device handshake.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConnectParams {
    /// Device identifier. Required; the handshake is refused without it.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Optional human-readable device name.
    #[serde(default)]
    pub device_name: Option<String>,
    /// Optional operating system string.
    #[serde(default)]
    pub os: Option<String>,
    /// Optional app version string.
    #[serde(default)]
    pub app_version: Option<String>,
}

fn user_from_headers(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(UserId::new)
}

/// `GET /ws/device` — Upgrade a mobile device connection.
pub async fn device_ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<DeviceConnectParams>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let Some(device_id) = params
        .device_id
        .filter(|s| !s.is_empty())
        .map(DeviceId::new)
    else {
        tracing::warn!("device handshake without deviceId refused");
        return GatewayError::HandshakeRejected("missing deviceId".to_string()).into_response();
    };
    let Some(user_id) = user_from_headers(&headers) else {
        tracing::warn!(%device_id, "device handshake without user header refused");
        return GatewayError::HandshakeRejected(format!("missing {USER_ID_HEADER} header"))
            .into_response();
    };

    let info = DeviceConnectInfo {
        device_id,
        user_id,
        device_name: params.device_name,
        os: params.os,
        app_version: params.app_version,
    };
    ws.on_upgrade(move |socket| run_device_connection(socket, state, info))
}

/// `GET /ws/web/updates` — Upgrade a browser update stream.
pub async fn updates_ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let Some(user_id) = user_from_headers(&headers) else {
        tracing::warn!("web handshake without user header refused");
        return GatewayError::HandshakeRejected(format!("missing {USER_ID_HEADER} header"))
            .into_response();
    };
    ws.on_upgrade(move |socket| run_browser_connection(socket, state, user_id))
}
