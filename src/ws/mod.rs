//! WebSocket layer: upgrade handlers, connection lifecycle, frame routing.
//!
//! Devices connect at `/ws/device` and browsers at `/ws/web/updates`;
//! both run one reader context and one spawned writer task coordinated
//! through the connection's outbound channel.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod router;
