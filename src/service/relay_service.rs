//! Relay service: the command and fan-out API over the registries.

use std::sync::Arc;

use crate::domain::{DeviceId, DeviceRegistry, RelayEvent, UserId, UserSessionRegistry};
use crate::error::GatewayError;

/// Public relay API used by REST handlers and the frame router.
///
/// Stateless coordinator over the two registries. Commands go down to one
/// device's outbound channel; events fan out to every browser session of
/// one user. The relay transports both without interpreting them.
#[derive(Debug, Clone)]
pub struct RelayService {
    devices: Arc<DeviceRegistry>,
    sessions: Arc<UserSessionRegistry>,
}

impl RelayService {
    /// Creates a new `RelayService` over the given registries.
    #[must_use]
    pub fn new(devices: Arc<DeviceRegistry>, sessions: Arc<UserSessionRegistry>) -> Self {
        Self { devices, sessions }
    }

    /// Returns the device registry.
    #[must_use]
    pub fn device_registry(&self) -> &Arc<DeviceRegistry> {
        &self.devices
    }

    /// Returns the browser-session registry.
    #[must_use]
    pub fn session_registry(&self) -> &Arc<UserSessionRegistry> {
        &self.sessions
    }

    /// Returns `true` if the device has a live connection right now.
    pub async fn is_online(&self, device_id: &DeviceId) -> bool {
        self.devices.is_online(device_id).await
    }

    /// Queues an opaque command frame on the device's outbound channel.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DeviceOffline`] when no connection is
    /// registered for `device_id`, or when the enqueue loses a race with a
    /// disconnect — both look the same to the caller: the command was not
    /// delivered.
    pub async fn send_command(
        &self,
        device_id: &DeviceId,
        command: &str,
    ) -> Result<(), GatewayError> {
        let Some(handle) = self.devices.lookup(device_id).await else {
            return Err(GatewayError::DeviceOffline(device_id.clone()));
        };
        handle.enqueue(command).map_err(|e| {
            tracing::warn!(%device_id, error = %e, "command enqueue failed");
            GatewayError::DeviceOffline(device_id.clone())
        })
    }

    /// Fans `event` out to every browser session of `user_id`.
    ///
    /// The event is serialized once; each session gets its own copy.
    /// Per-session enqueue failures are logged and skipped so one dead tab
    /// never blocks delivery to the others. Returns the number of sessions
    /// the event was queued for.
    pub async fn broadcast_to_user(&self, user_id: &UserId, event: &RelayEvent) -> usize {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(%user_id, error = %e, "event serialization failed");
                return 0;
            }
        };

        let sessions = self.sessions.sessions_of(user_id).await;
        if sessions.is_empty() {
            tracing::debug!(%user_id, event_type = event.event_type(), "no sessions to notify");
            return 0;
        }

        let mut delivered = 0;
        for handle in &sessions {
            match handle.enqueue(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(%user_id, error = %e, "event fan-out to session failed");
                }
            }
        }
        delivered
    }

    /// Closes every registered handle, device and browser alike.
    ///
    /// Each connection then runs its ordinary disconnect cleanup, so
    /// shutdown and peer-initiated close share one code path.
    pub async fn shutdown(&self) {
        for handle in self.devices.snapshot().await {
            handle.close();
        }
        for handle in self.sessions.snapshot().await {
            handle.close();
        }
        tracing::info!("relay shut down; all handles closed");
    }
}
