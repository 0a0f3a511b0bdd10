//! Store records for devices and backed-up accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{BackupStatus, DeviceId, UserId};

/// Persistent record of one known device.
///
/// The `online` flag is a best-effort mirror of the connection registry,
/// refreshed on connect and disconnect; read paths overlay the live value
/// from [`crate::domain::DeviceRegistry`] before returning it to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Device identifier (connection key).
    pub id: DeviceId,
    /// User owning this device.
    pub user_id: UserId,
    /// Human-readable device name from the handshake.
    pub device_name: Option<String>,
    /// Operating system string from the handshake.
    pub os: Option<String>,
    /// App version string from the handshake.
    pub app_version: Option<String>,
    /// Whether the device was connected at the last status write.
    pub online: bool,
    /// Last time the device was seen connecting or disconnecting.
    pub last_seen: Option<DateTime<Utc>>,
    /// Account currently active on the device.
    pub active_account_id: Option<String>,
    /// Phone number of the active account.
    pub active_account_phone: Option<String>,
    /// State of the most recent backup.
    pub last_backup_status: Option<BackupStatus>,
    /// Account the most recent backup concerned.
    pub last_backup_account_id: Option<String>,
    /// Detail message from the most recent backup update.
    pub last_backup_message: Option<String>,
    /// Storage path reported with the most recent backup.
    pub last_backup_path: Option<String>,
    /// When the most recent backup update arrived.
    pub last_backup_at: Option<DateTime<Utc>>,
}

impl DeviceRecord {
    /// Creates a blank record for a device first seen at connect time.
    #[must_use]
    pub fn new(id: DeviceId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            device_name: None,
            os: None,
            app_version: None,
            online: false,
            last_seen: None,
            active_account_id: None,
            active_account_phone: None,
            last_backup_status: None,
            last_backup_account_id: None,
            last_backup_message: None,
            last_backup_path: None,
            last_backup_at: None,
        }
    }
}

/// Persistent record of one completed account backup.
///
/// Unique per `(user_id, account_id)`: a later backup of the same account
/// merges into the existing record instead of creating a second one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackedUpAccountRecord {
    /// Record identifier.
    pub id: Uuid,
    /// User owning the backup.
    pub user_id: UserId,
    /// Device that performed the backup.
    pub device_id: DeviceId,
    /// Backed-up account identifier.
    pub account_id: String,
    /// Display name of the account at backup time.
    pub account_name: String,
    /// Phone number of the account at backup time.
    pub phone_number: String,
    /// Storage path of the backup archive, when reported.
    pub backup_path: Option<String>,
    /// When the backup completed.
    pub backup_at: DateTime<Utc>,
}

impl BackedUpAccountRecord {
    /// Creates a new record with a fresh id and the current timestamp.
    #[must_use]
    pub fn new(
        user_id: UserId,
        device_id: DeviceId,
        account_id: impl Into<String>,
        account_name: impl Into<String>,
        phone_number: impl Into<String>,
        backup_path: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            device_id,
            account_id: account_id.into(),
            account_name: account_name.into(),
            phone_number: phone_number.into(),
            backup_path,
            backup_at: Utc::now(),
        }
    }
}
