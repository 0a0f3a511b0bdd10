//! Events fanned out to a user's browser sessions.
//!
//! A [`RelayEvent`] is the immutable value handed from the frame router to
//! [`crate::service::RelayService::broadcast_to_user`]. On the wire it
//! serializes to `{"type": "<TYPE>", "payload": {...}}` with camelCase
//! payload fields, always carrying the canonical `deviceId` and
//! `timestamp`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DeviceId;

/// Backup lifecycle states reported by devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackupStatus {
    /// Backup requested, device is preparing.
    Init,
    /// Device is producing the backup archive.
    BackingUp,
    /// Archive is being uploaded to the backend.
    Uploading,
    /// Producing the archive failed.
    BackupFailed,
    /// Uploading the archive failed.
    UploadFailed,
    /// The user canceled the backup on the device.
    Canceled,
    /// Backup finished and the archive is stored.
    Completed,
}

impl BackupStatus {
    /// Returns the wire representation of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::BackingUp => "BACKING_UP",
            Self::Uploading => "UPLOADING",
            Self::BackupFailed => "BACKUP_FAILED",
            Self::UploadFailed => "UPLOAD_FAILED",
            Self::Canceled => "CANCELED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Parses a wire representation, returning `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INIT" => Some(Self::Init),
            "BACKING_UP" => Some(Self::BackingUp),
            "UPLOADING" => Some(Self::Uploading),
            "BACKUP_FAILED" => Some(Self::BackupFailed),
            "UPLOAD_FAILED" => Some(Self::UploadFailed),
            "CANCELED" => Some(Self::Canceled),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event broadcast to every browser session of a device's owning user.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum RelayEvent {
    /// Device presence or active-account change.
    #[serde(rename = "DEVICE_STATUS_UPDATE", rename_all = "camelCase")]
    DeviceStatusUpdate {
        /// Device the update concerns.
        device_id: DeviceId,
        /// Online flag, present on connect/disconnect updates.
        #[serde(skip_serializing_if = "Option::is_none")]
        online: Option<bool>,
        /// Last-seen timestamp, present on connect/disconnect updates.
        #[serde(skip_serializing_if = "Option::is_none")]
        last_seen: Option<DateTime<Utc>>,
        /// Account currently active on the device, when reported.
        #[serde(skip_serializing_if = "Option::is_none")]
        active_account_id: Option<String>,
        /// Phone number of the active account, when reported.
        #[serde(skip_serializing_if = "Option::is_none")]
        active_account_phone: Option<String>,
        /// Server-side event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Progress of a backup running on the device.
    #[serde(rename = "BACKUP_STATUS_UPDATE", rename_all = "camelCase")]
    BackupStatusUpdate {
        /// Device the update concerns.
        device_id: DeviceId,
        /// Account being backed up.
        account_id: String,
        /// Current backup state.
        status: BackupStatus,
        /// Free-text detail from the device.
        message: String,
        /// Server-side event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Progress of a friends export running on the device.
    #[serde(rename = "FRIENDS_EXPORT_STATUS_UPDATE", rename_all = "camelCase")]
    FriendsExportStatusUpdate {
        /// Device the update concerns.
        device_id: DeviceId,
        /// Account whose friends are exported.
        account_id: String,
        /// Phone number of that account.
        phone_number: String,
        /// Export state string as reported by the device.
        status: String,
        /// Raw export payload, passed through untouched.
        data: serde_json::Value,
        /// Free-text detail from the device.
        message: String,
        /// Server-side event timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl RelayEvent {
    /// Returns the device this event concerns.
    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::DeviceStatusUpdate { device_id, .. }
            | Self::BackupStatusUpdate { device_id, .. }
            | Self::FriendsExportStatusUpdate { device_id, .. } => device_id,
        }
    }

    /// Returns the wire `type` tag as a static string slice.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::DeviceStatusUpdate { .. } => "DEVICE_STATUS_UPDATE",
            Self::BackupStatusUpdate { .. } => "BACKUP_STATUS_UPDATE",
            Self::FriendsExportStatusUpdate { .. } => "FRIENDS_EXPORT_STATUS_UPDATE",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn backup_status_wire_round_trip() {
        for status in [
            BackupStatus::Init,
            BackupStatus::BackingUp,
            BackupStatus::Uploading,
            BackupStatus::BackupFailed,
            BackupStatus::UploadFailed,
            BackupStatus::Canceled,
            BackupStatus::Completed,
        ] {
            assert_eq!(BackupStatus::parse(status.as_str()), Some(status));
        }
        assert!(BackupStatus::parse("NOT_A_STATUS").is_none());
    }

    #[test]
    fn device_status_update_wire_shape() {
        let event = RelayEvent::DeviceStatusUpdate {
            device_id: DeviceId::new("D1"),
            online: Some(true),
            last_seen: Some(Utc::now()),
            active_account_id: None,
            active_account_phone: None,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap_or_default();

        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("DEVICE_STATUS_UPDATE"));
        let payload = value.get("payload").cloned().unwrap_or_default();
        assert_eq!(payload.get("deviceId").and_then(|v| v.as_str()), Some("D1"));
        assert_eq!(payload.get("online").and_then(serde_json::Value::as_bool), Some(true));
        // Optional fields that are unset stay off the wire.
        assert!(payload.get("activeAccountId").is_none());
        assert!(payload.get("timestamp").is_some());
    }

    #[test]
    fn backup_status_update_wire_shape() {
        let event = RelayEvent::BackupStatusUpdate {
            device_id: DeviceId::new("D1"),
            account_id: "A1".to_string(),
            status: BackupStatus::BackingUp,
            message: "50%".to_string(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap_or_default();

        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("BACKUP_STATUS_UPDATE"));
        let payload = value.get("payload").cloned().unwrap_or_default();
        assert_eq!(payload.get("accountId").and_then(|v| v.as_str()), Some("A1"));
        assert_eq!(payload.get("status").and_then(|v| v.as_str()), Some("BACKING_UP"));
    }

    #[test]
    fn friends_export_passes_data_through() {
        let data = serde_json::json!({"friends": [{"name": "Bob"}]});
        let event = RelayEvent::FriendsExportStatusUpdate {
            device_id: DeviceId::new("D1"),
            account_id: "A1".to_string(),
            phone_number: "555".to_string(),
            status: "COMPLETED".to_string(),
            data: data.clone(),
            message: String::new(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap_or_default();
        let payload = value.get("payload").cloned().unwrap_or_default();
        assert_eq!(payload.get("data"), Some(&data));
    }

    #[test]
    fn event_accessors() {
        let event = RelayEvent::BackupStatusUpdate {
            device_id: DeviceId::new("D9"),
            account_id: "A1".to_string(),
            status: BackupStatus::Completed,
            message: String::new(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.device_id().as_str(), "D9");
        assert_eq!(event.event_type(), "BACKUP_STATUS_UPDATE");
    }
}
