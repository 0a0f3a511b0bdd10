//! Domain layer: connection identity, handles, registries, and relay events.
//!
//! This module contains the relay's core model: typed identifiers, the
//! per-connection outbound channel, the two registries that hold all
//! shared mutable state, and the event type fanned out to browsers.

pub mod device_registry;
pub mod handle;
pub mod ids;
pub mod relay_event;
pub mod session_registry;

pub use device_registry::DeviceRegistry;
pub use handle::{ConnectionHandle, ConnectionIdentity, OutboundChannel};
pub use ids::{DeviceId, SessionId, UserId};
pub use relay_event::{BackupStatus, RelayEvent};
pub use session_registry::UserSessionRegistry;
