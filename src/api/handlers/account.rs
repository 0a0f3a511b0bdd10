//! Backed-up-account endpoints: list, delete, transfer.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{BackedUpAccountDto, TransferAccountsRequest};
use crate::api::require_user;
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /accounts` — List the caller's backed-up accounts.
///
/// # Errors
///
/// Returns [`GatewayError`] when the identity header is missing or the
/// store fails.
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    tag = "Accounts",
    summary = "List my backed-up accounts",
    responses(
        (status = 200, description = "Backed-up account list", body = Vec<BackedUpAccountDto>),
        (status = 401, description = "Missing identity header", body = ErrorResponse),
    )
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = require_user(&headers)?;
    let accounts = state.device_service.backed_up_accounts_of(&user_id).await?;
    let dtos: Vec<BackedUpAccountDto> =
        accounts.into_iter().map(BackedUpAccountDto::from).collect();
    Ok(Json(dtos))
}

/// `DELETE /accounts/:id` — Delete one backed-up-account record.
///
/// # Errors
///
/// Returns [`GatewayError::AccountNotFound`] for an unknown id and
/// [`GatewayError::AccessDenied`] when the caller is not the owner.
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{id}",
    tag = "Accounts",
    summary = "Delete a backed-up account",
    params(
        ("id" = Uuid, Path, description = "Backed-up-account record id"),
    ),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Record not found", body = ErrorResponse),
    )
)]
pub async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = require_user(&headers)?;
    state
        .device_service
        .delete_backed_up_account(id, &user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /accounts/transfer` — Transfer backed-up accounts to another user.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] when the target is the
/// caller, plus the per-record not-found/ownership errors.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/transfer",
    tag = "Accounts",
    summary = "Transfer backed-up accounts",
    request_body = TransferAccountsRequest,
    responses(
        (status = 200, description = "Transferred records", body = Vec<BackedUpAccountDto>),
        (status = 400, description = "Invalid transfer target", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
    )
)]
pub async fn transfer_accounts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TransferAccountsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = require_user(&headers)?;
    let target = UserId::new(req.target_user_id);
    let transferred = state
        .device_service
        .transfer_backed_up_accounts(&req.account_ids, &target, &user_id)
        .await?;
    let dtos: Vec<BackedUpAccountDto> = transferred
        .into_iter()
        .map(BackedUpAccountDto::from)
        .collect();
    Ok(Json(dtos))
}

/// Backed-up-account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/accounts/{id}", delete(delete_account))
        .route("/accounts/transfer", post(transfer_accounts))
}
