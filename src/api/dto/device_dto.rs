//! Device DTOs for list and detail endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::persistence::DeviceRecord;

/// Device representation returned by the REST API.
///
/// `online` reflects the live connection registry, not the last
/// persisted value.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDto {
    /// Device identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Human-readable device name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// Operating system string, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// App version string, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// Whether the device is connected right now.
    pub online: bool,
    /// Last time the device connected or disconnected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    /// Account currently active on the device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_account_id: Option<String>,
    /// Phone number of the active account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_account_phone: Option<String>,
    /// State of the most recent backup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_backup_status: Option<String>,
    /// When the most recent backup update arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_backup_at: Option<DateTime<Utc>>,
}

impl From<DeviceRecord> for DeviceDto {
    fn from(record: DeviceRecord) -> Self {
        Self {
            id: record.id.to_string(),
            user_id: record.user_id.to_string(),
            device_name: record.device_name,
            os: record.os,
            app_version: record.app_version,
            online: record.online,
            last_seen: record.last_seen,
            active_account_id: record.active_account_id,
            active_account_phone: record.active_account_phone,
            last_backup_status: record
                .last_backup_status
                .map(|s| s.as_str().to_string()),
            last_backup_at: record.last_backup_at,
        }
    }
}
