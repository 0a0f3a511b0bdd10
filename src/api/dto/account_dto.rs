//! Backed-up-account DTOs for list, delete, and transfer endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::persistence::BackedUpAccountRecord;

/// Backed-up-account representation returned by the REST API.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackedUpAccountDto {
    /// Record identifier.
    pub id: Uuid,
    /// User owning the backup.
    pub user_id: String,
    /// Device that performed the backup.
    pub device_id: String,
    /// Backed-up account identifier.
    pub account_id: String,
    /// Display name of the account at backup time.
    pub account_name: String,
    /// Phone number of the account at backup time.
    pub phone_number: String,
    /// Storage path of the backup archive, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
    /// When the backup completed.
    pub backup_at: DateTime<Utc>,
}

impl From<BackedUpAccountRecord> for BackedUpAccountDto {
    fn from(record: BackedUpAccountRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id.to_string(),
            device_id: record.device_id.to_string(),
            account_id: record.account_id,
            account_name: record.account_name,
            phone_number: record.phone_number,
            backup_path: record.backup_path,
            backup_at: record.backup_at,
        }
    }
}

/// Request body for `POST /accounts/transfer`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferAccountsRequest {
    /// Backed-up-account record ids to transfer.
    pub account_ids: Vec<Uuid>,
    /// User receiving ownership.
    pub target_user_id: String,
}
