//! Inbound device frame types: envelope and per-type payloads.
//!
//! Devices send text frames shaped `{"type": "<TYPE>", "payload": {...}}`.
//! The envelope is parsed first; the payload is then decoded into the
//! typed struct for its frame type. Unknown types are reported as such so
//! the router can ignore them without dropping the connection.

use serde::Deserialize;

use crate::domain::BackupStatus;
use crate::error::GatewayError;

/// Raw frame envelope as received from a device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceFrame {
    /// Frame type discriminator.
    #[serde(rename = "type")]
    pub frame_type: String,
    /// Type-specific payload, decoded in a second step.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl DeviceFrame {
    /// Parses the outer envelope of a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedFrame`] when the text is not a
    /// JSON object with a `type` field.
    pub fn parse(text: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(text).map_err(|e| GatewayError::MalformedFrame(e.to_string()))
    }
}

/// Payload of a `DEVICE_STATUS_UPDATE` frame: the active account changed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatusPayload {
    /// Account now active on the device.
    #[serde(default)]
    pub account_id: Option<String>,
    /// Phone number of that account.
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Payload of a `BACKUP_STATUS_UPDATE` frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatusPayload {
    /// Current backup state.
    pub status: BackupStatus,
    /// Account being backed up.
    #[serde(default)]
    pub account_id: String,
    /// Display name, sent with `COMPLETED` updates.
    #[serde(default)]
    pub account_name: Option<String>,
    /// Phone number, sent with `COMPLETED` updates.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Free-text detail from the device.
    #[serde(default)]
    pub message: String,
    /// Storage path of the finished archive.
    #[serde(default)]
    pub backup_path: Option<String>,
}

/// Payload of a `FRIENDS_EXPORT_STATUS_UPDATE` frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsExportPayload {
    /// Account whose friends are exported.
    #[serde(default)]
    pub account_id: String,
    /// Phone number of that account.
    #[serde(default)]
    pub phone_number: String,
    /// Export state string, passed through as-is.
    #[serde(default)]
    pub status: String,
    /// Raw export payload, passed through untouched.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Free-text detail from the device.
    #[serde(default)]
    pub message: String,
}

/// Parsed inbound message, one variant per supported frame type.
#[derive(Debug, Clone)]
pub enum DeviceMessage {
    /// `DEVICE_STATUS_UPDATE`
    StatusUpdate(DeviceStatusPayload),
    /// `BACKUP_STATUS_UPDATE`
    BackupUpdate(BackupStatusPayload),
    /// `FRIENDS_EXPORT_STATUS_UPDATE`
    FriendsExport(FriendsExportPayload),
}

impl DeviceMessage {
    /// Decodes a parsed envelope into a typed message.
    ///
    /// Returns `Ok(None)` for frame types this gateway does not know,
    /// which the router ignores for forward compatibility.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedFrame`] when the payload does not
    /// match the shape its frame type requires.
    pub fn from_frame(frame: DeviceFrame) -> Result<Option<Self>, GatewayError> {
        let malformed = |e: serde_json::Error| GatewayError::MalformedFrame(e.to_string());
        match frame.frame_type.as_str() {
            "DEVICE_STATUS_UPDATE" => serde_json::from_value(frame.payload)
                .map(|p| Some(Self::StatusUpdate(p)))
                .map_err(malformed),
            "BACKUP_STATUS_UPDATE" => serde_json::from_value(frame.payload)
                .map(|p| Some(Self::BackupUpdate(p)))
                .map_err(malformed),
            "FRIENDS_EXPORT_STATUS_UPDATE" => serde_json::from_value(frame.payload)
                .map(|p| Some(Self::FriendsExport(p)))
                .map_err(malformed),
            _ => Ok(None),
        }
    }
}
