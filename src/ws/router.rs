//! Inbound frame router: dispatch by frame type with per-frame isolation.
//!
//! Frames are independent; nothing the router does for one frame can
//! close the connection or affect the next frame. Malformed frames are
//! logged and dropped, unknown types are logged and ignored.

use std::sync::Arc;

use super::messages::{DeviceFrame, DeviceMessage};
use crate::domain::{DeviceId, UserId};
use crate::service::DeviceService;

/// Display name used when a `COMPLETED` update omits the account name.
const UNKNOWN_ACCOUNT_NAME: &str = "Unknown";

/// Routes inbound device frames to the matching [`DeviceService`] action.
#[derive(Debug, Clone)]
pub struct DeviceMessageRouter {
    service: Arc<DeviceService>,
}

impl DeviceMessageRouter {
    /// Creates a router over the given service.
    #[must_use]
    pub fn new(service: Arc<DeviceService>) -> Self {
        Self { service }
    }

    /// Processes one inbound text frame from `device_id`.
    ///
    /// Never returns an error: every failure mode is handled here, logged,
    /// and contained to this frame.
    pub async fn route_frame(&self, device_id: &DeviceId, user_id: &UserId, text: &str) {
        let frame = match DeviceFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(%device_id, error = %e, "malformed frame dropped");
                return;
            }
        };

        let frame_type = frame.frame_type.clone();
        let message = match DeviceMessage::from_frame(frame) {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::warn!(%device_id, frame_type, "unknown frame type ignored");
                return;
            }
            Err(e) => {
                tracing::warn!(%device_id, frame_type, error = %e, "malformed payload dropped");
                return;
            }
        };
        tracing::debug!(%device_id, frame_type, "processing device frame");

        match message {
            DeviceMessage::StatusUpdate(payload) => {
                self.service
                    .update_active_account(
                        device_id,
                        user_id,
                        payload.account_id,
                        payload.phone_number,
                    )
                    .await;
            }
            DeviceMessage::BackupUpdate(payload) => {
                self.service
                    .update_backup_status(
                        device_id,
                        user_id,
                        payload.status,
                        &payload.account_id,
                        payload.account_name.as_deref().unwrap_or(UNKNOWN_ACCOUNT_NAME),
                        payload.phone_number.as_deref().unwrap_or_default(),
                        &payload.message,
                        payload.backup_path.as_deref(),
                    )
                    .await;
            }
            DeviceMessage::FriendsExport(payload) => {
                self.service
                    .update_friends_export_status(
                        device_id,
                        user_id,
                        &payload.account_id,
                        &payload.phone_number,
                        &payload.status,
                        payload.data,
                        &payload.message,
                    )
                    .await;
            }
        }
    }
}
