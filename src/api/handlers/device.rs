//! Device endpoints: listing, detail, and command initiation.
//!
//! Command endpoints pre-flight the live registry and reject with 503
//! when the device is offline, instead of queuing the command.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::DeviceDto;
use crate::api::require_user;
use crate::app_state::AppState;
use crate::domain::DeviceId;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /devices/user/me` — List the caller's devices.
///
/// # Errors
///
/// Returns [`GatewayError`] when the identity header is missing or the
/// store fails.
#[utoipa::path(
    get,
    path = "/api/v1/devices/user/me",
    tag = "Devices",
    summary = "List my devices",
    description = "Returns every device owned by the calling user, with the online flag taken from the live connection registry.",
    responses(
        (status = 200, description = "Device list", body = Vec<DeviceDto>),
        (status = 401, description = "Missing identity header", body = ErrorResponse),
    )
)]
pub async fn list_my_devices(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = require_user(&headers)?;
    let devices = state.device_service.devices_of_user(&user_id).await?;
    let dtos: Vec<DeviceDto> = devices.into_iter().map(DeviceDto::from).collect();
    Ok(Json(dtos))
}

/// `GET /devices/:id` — Get one device.
///
/// # Errors
///
/// Returns [`GatewayError::DeviceNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}",
    tag = "Devices",
    summary = "Get device details",
    description = "Returns one device with the online flag taken from the live connection registry.",
    params(
        ("id" = String, Path, description = "Device identifier"),
    ),
    responses(
        (status = 200, description = "Device details", body = DeviceDto),
        (status = 404, description = "Device not found", body = ErrorResponse),
    )
)]
pub async fn get_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let _user_id = require_user(&headers)?;
    let device = state
        .device_service
        .device_by_id(&DeviceId::new(id))
        .await?;
    Ok(Json(DeviceDto::from(device)))
}

/// `POST /devices/:id/backup` — Ask the device to start a backup.
///
/// # Errors
///
/// Returns [`GatewayError::DeviceOffline`] (503) when the device has no
/// live connection.
#[utoipa::path(
    post,
    path = "/api/v1/devices/{id}/backup",
    tag = "Devices",
    summary = "Start a backup",
    description = "Relays the start-backup command to the device. Fails fast with 503 when the device is offline; commands are never queued.",
    params(
        ("id" = String, Path, description = "Device identifier"),
    ),
    responses(
        (status = 202, description = "Command relayed to the device"),
        (status = 503, description = "Device offline", body = ErrorResponse),
    )
)]
pub async fn request_backup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = require_user(&headers)?;
    state
        .device_service
        .initiate_backup(&user_id, &DeviceId::new(id))
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// `POST /devices/:id/export-friends` — Ask the device to export friends.
///
/// # Errors
///
/// Returns [`GatewayError::DeviceOffline`] (503) when the device has no
/// live connection.
#[utoipa::path(
    post,
    path = "/api/v1/devices/{id}/export-friends",
    tag = "Devices",
    summary = "Export the friends list",
    description = "Relays the export-friends command to the device.",
    params(
        ("id" = String, Path, description = "Device identifier"),
    ),
    responses(
        (status = 202, description = "Command relayed to the device"),
        (status = 503, description = "Device offline", body = ErrorResponse),
    )
)]
pub async fn request_friends_export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = require_user(&headers)?;
    state
        .device_service
        .initiate_friends_export(&user_id, &DeviceId::new(id))
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// `POST /devices/:id/refresh-account` — Ask the device to refresh its
/// active account.
///
/// # Errors
///
/// Returns [`GatewayError::DeviceOffline`] (503) when the device has no
/// live connection.
#[utoipa::path(
    post,
    path = "/api/v1/devices/{id}/refresh-account",
    tag = "Devices",
    summary = "Refresh the active account",
    description = "Relays the refresh-account command to the device.",
    params(
        ("id" = String, Path, description = "Device identifier"),
    ),
    responses(
        (status = 202, description = "Command relayed to the device"),
        (status = 503, description = "Device offline", body = ErrorResponse),
    )
)]
pub async fn request_account_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = require_user(&headers)?;
    state
        .device_service
        .refresh_account(&user_id, &DeviceId::new(id))
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// Device routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/devices/user/me", get(list_my_devices))
        .route("/devices/{id}", get(get_device))
        .route("/devices/{id}/backup", post(request_backup))
        .route("/devices/{id}/export-friends", post(request_friends_export))
        .route("/devices/{id}/refresh-account", post(request_account_refresh))
}
