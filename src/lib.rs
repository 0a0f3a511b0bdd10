//! # fleet-gateway
//!
//! REST API and WebSocket gateway for mobile device fleets.
//!
//! The gateway keeps long-lived WebSocket connections open to mobile
//! devices and to browser clients and relays structured events between
//! them: commands go down to a specific device, status events fan out to
//! every browser session of the device's owning user. Authentication is
//! handled upstream — this service is a relay and coordination layer.
//!
//! ## Architecture
//!
//! ```text
//! Devices (/ws/device)        Browsers (/ws/web/updates, REST)
//!     │                            │
//!     ├── ConnectionLifecycle (ws/)
//!     ├── DeviceMessageRouter (ws/)
//!     │
//!     ├── DeviceService (service/)
//!     ├── RelayService (service/)
//!     │
//!     ├── DeviceRegistry + UserSessionRegistry (domain/)
//!     │
//!     └── PostgreSQL stores (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;

use axum::Router;
use axum::routing::get;

/// Assembles the full application router: REST endpoints plus the two
/// WebSocket upgrade routes.
pub fn build_app(state: app_state::AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .route("/ws/device", get(ws::handler::device_ws_handler))
        .route("/ws/web/updates", get(ws::handler::updates_ws_handler))
        .with_state(state)
}
