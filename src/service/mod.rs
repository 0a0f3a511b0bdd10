//! Service layer: relay API and device orchestration.
//!
//! [`RelayService`] is the narrow command/fan-out API over the registries;
//! [`DeviceService`] coordinates persistence updates and event emission
//! for every lifecycle transition and inbound frame.

pub mod device_service;
pub mod relay_service;

pub use device_service::{DeviceConnectInfo, DeviceService};
pub use relay_service::RelayService;
