//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::{DeviceService, RelayService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Device orchestration: persistence updates and event emission.
    pub device_service: Arc<DeviceService>,
    /// Relay API over the connection registries.
    pub relay: Arc<RelayService>,
    /// Buffer capacity of each connection's outbound channel.
    pub outbound_capacity: usize,
}
