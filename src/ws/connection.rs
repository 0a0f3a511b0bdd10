//! WebSocket connection lifecycle for devices and browser sessions.
//!
//! Each accepted socket runs two execution contexts: the reader loop in
//! the upgrade task and a spawned writer task draining the connection's
//! outbound channel. They coordinate only through that channel and its
//! close signal, so local eviction (supersede, shutdown) and peer-side
//! close converge on the same cleanup path.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};

use super::router::DeviceMessageRouter;
use crate::app_state::AppState;
use crate::domain::{ConnectionHandle, SessionId, UserId};
use crate::service::DeviceConnectInfo;

/// Runs the lifecycle of one device connection.
///
/// Registers the handle (closing a superseded predecessor), notifies
/// persistence and browsers of the online transition, then routes frames
/// until the socket or the handle closes. Cleanup unregisters only when
/// this handle is still the authoritative one, so a stale disconnect never
/// marks a freshly reconnected device offline.
pub async fn run_device_connection(socket: WebSocket, state: AppState, info: DeviceConnectInfo) {
    let (handle, outbound_rx) =
        ConnectionHandle::for_device(info.device_id.clone(), state.outbound_capacity);
    let registry = Arc::clone(state.relay.device_registry());

    if let Some(previous) = registry
        .register(info.device_id.clone(), Arc::clone(&handle))
        .await
    {
        // Last writer wins: the stale session is closed without a reason
        // frame, exactly as a dropped socket would look to that peer.
        previous.close();
        tracing::info!(device_id = %info.device_id, "previous connection superseded");
    }
    tracing::info!(device_id = %info.device_id, user_id = %info.user_id, "device connected");

    state.device_service.handle_device_connected(&info).await;

    let (ws_tx, mut ws_rx) = socket.split();
    let writer = tokio::spawn(run_writer(ws_tx, outbound_rx, handle.close_signal()));

    let router = DeviceMessageRouter::new(Arc::clone(&state.device_service));
    let mut close_signal = handle.close_signal();
    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    router
                        .route_frame(&info.device_id, &info.user_id, &text)
                        .await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(device_id = %info.device_id, error = %e, "websocket receive error");
                    break;
                }
            },
            // Local eviction: superseded by a reconnect or relay shutdown.
            // `wait_for` also catches a close that landed before this loop
            // subscribed to the signal.
            _ = async { let _ = close_signal.wait_for(|closed| *closed).await; } => break,
        }
    }

    handle.close();
    let was_registered = registry.unregister(&info.device_id, &handle).await;
    if was_registered {
        state
            .device_service
            .handle_device_disconnected(&info.device_id, &info.user_id)
            .await;
    } else {
        tracing::debug!(device_id = %info.device_id, "superseded connection closed, offline transition skipped");
    }
    writer.abort();
    tracing::debug!(device_id = %info.device_id, "device connection finished");
}

/// Runs the lifecycle of one browser session.
///
/// Browsers only listen; inbound text frames are logged and discarded.
/// Multiple concurrent sessions per user are expected and all kept.
pub async fn run_browser_connection(socket: WebSocket, state: AppState, user_id: UserId) {
    let session_id = SessionId::new();
    let (handle, outbound_rx) =
        ConnectionHandle::for_browser(user_id.clone(), session_id, state.outbound_capacity);
    let sessions = Arc::clone(state.relay.session_registry());

    sessions.add(user_id.clone(), Arc::clone(&handle)).await;
    tracing::info!(%user_id, %session_id, "web client connected");

    let (ws_tx, mut ws_rx) = socket.split();
    let writer = tokio::spawn(run_writer(ws_tx, outbound_rx, handle.close_signal()));

    let mut close_signal = handle.close_signal();
    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!(%user_id, %session_id, len = text.len(), "browser frame ignored");
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(%user_id, %session_id, error = %e, "websocket receive error");
                    break;
                }
            },
            _ = async { let _ = close_signal.wait_for(|closed| *closed).await; } => break,
        }
    }

    handle.close();
    // Idempotent: shutdown may have raced this cleanup already.
    let _ = sessions.remove(&user_id, &handle).await;
    writer.abort();
    tracing::info!(%user_id, %session_id, "web client disconnected");
}

/// Writer task: drains the outbound channel into the socket sink.
///
/// Exits when the channel closes, the close signal fires (sending a Close
/// frame to the peer first), or the sink reports a broken connection.
async fn run_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    mut closed: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(text) => {
                    if sink.send(Message::text(text)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = async { let _ = closed.wait_for(|closed| *closed).await; } => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }
}
