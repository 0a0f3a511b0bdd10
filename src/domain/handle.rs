//! Live-connection handles and the bounded outbound channel.
//!
//! Every accepted WebSocket owns exactly one [`ConnectionHandle`], held by
//! the registry that accepted it. The handle wraps an [`OutboundChannel`]:
//! a bounded, ordered, single-consumer queue drained by the connection's
//! writer task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};

use super::{DeviceId, SessionId, UserId};
use crate::error::ChannelError;

/// Identity attached to one live connection at handshake time.
#[derive(Debug, Clone)]
pub enum ConnectionIdentity {
    /// A mobile device connection, keyed by its device id.
    Device(DeviceId),
    /// A browser session, keyed by the owning user plus a per-tab session id.
    Browser {
        /// Owning user.
        user_id: UserId,
        /// Server-generated id for this tab.
        session_id: SessionId,
    },
}

/// Bounded, ordered queue of outbound text frames for one connection.
///
/// Delivery policy is fail-fast and uniform for every caller:
/// [`OutboundChannel::enqueue`] never blocks. A full buffer yields
/// [`ChannelError::Overflow`] and a closed channel [`ChannelError::Closed`];
/// both mean the peer is unreachable from the caller's point of view.
/// Frames that were accepted are delivered strictly in enqueue order.
#[derive(Debug)]
pub struct OutboundChannel {
    tx: mpsc::Sender<String>,
    close_tx: watch::Sender<bool>,
}

impl OutboundChannel {
    /// Creates a channel with the given buffer capacity, returning the
    /// receiving half for the connection's writer task.
    fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let (close_tx, _) = watch::channel(false);
        (Self { tx, close_tx }, rx)
    }

    /// Queues a text frame for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] once the channel has been closed
    /// and [`ChannelError::Overflow`] when the buffer is full.
    pub fn enqueue(&self, frame: String) -> Result<(), ChannelError> {
        if *self.close_tx.borrow() {
            return Err(ChannelError::Closed);
        }
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ChannelError::Overflow,
            mpsc::error::TrySendError::Closed(_) => ChannelError::Closed,
        })
    }

    /// Closes the channel. Idempotent; returns `true` only for the call
    /// that actually performed the close.
    ///
    /// Closing signals the writer task to stop and makes every later
    /// [`OutboundChannel::enqueue`] fail with [`ChannelError::Closed`].
    pub fn close(&self) -> bool {
        !self.close_tx.send_replace(true)
    }

    /// Returns `true` once the channel has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.close_tx.borrow()
    }

    /// Returns a watch receiver that resolves when the channel closes.
    #[must_use]
    pub fn close_signal(&self) -> watch::Receiver<bool> {
        self.close_tx.subscribe()
    }
}

/// Handle to one live socket: identity, outbound channel, and liveness.
///
/// Created on a successful handshake and owned by exactly one registry
/// entry at a time; message-processing code only ever sees shared
/// references. Destroyed when the socket closes or the registry evicts it.
#[derive(Debug)]
pub struct ConnectionHandle {
    identity: ConnectionIdentity,
    channel: OutboundChannel,
    connected_at: DateTime<Utc>,
}

impl ConnectionHandle {
    /// Creates a handle for a device connection, returning the receiving
    /// half of its outbound channel for the writer task.
    #[must_use]
    pub fn for_device(
        device_id: DeviceId,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        Self::build(ConnectionIdentity::Device(device_id), capacity)
    }

    /// Creates a handle for a browser session, returning the receiving
    /// half of its outbound channel for the writer task.
    #[must_use]
    pub fn for_browser(
        user_id: UserId,
        session_id: SessionId,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        Self::build(
            ConnectionIdentity::Browser {
                user_id,
                session_id,
            },
            capacity,
        )
    }

    fn build(
        identity: ConnectionIdentity,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (channel, rx) = OutboundChannel::new(capacity);
        let handle = Arc::new(Self {
            identity,
            channel,
            connected_at: Utc::now(),
        });
        (handle, rx)
    }

    /// Returns the identity attached at handshake time.
    #[must_use]
    pub fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    /// Returns when the connection completed its handshake.
    #[must_use]
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Queues a text frame on the outbound channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the channel is closed or full.
    pub fn enqueue(&self, frame: impl Into<String>) -> Result<(), ChannelError> {
        self.channel.enqueue(frame.into())
    }

    /// Closes the outbound channel. Idempotent; see
    /// [`OutboundChannel::close`].
    pub fn close(&self) -> bool {
        self.channel.close()
    }

    /// Returns `true` once the connection has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    /// Returns a watch receiver that resolves when the handle closes.
    #[must_use]
    pub fn close_signal(&self) -> watch::Receiver<bool> {
        self.channel.close_signal()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_are_delivered_in_enqueue_order() {
        let (handle, mut rx) = ConnectionHandle::for_device(DeviceId::new("D1"), 8);
        assert!(handle.enqueue("a").is_ok());
        assert!(handle.enqueue("b").is_ok());
        assert!(handle.enqueue("c").is_ok());

        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await.as_deref(), Some("b"));
        assert_eq!(rx.recv().await.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn full_buffer_fails_with_overflow() {
        let (handle, _rx) = ConnectionHandle::for_device(DeviceId::new("D1"), 1);
        assert!(handle.enqueue("a").is_ok());
        assert!(matches!(handle.enqueue("b"), Err(ChannelError::Overflow)));
    }

    #[tokio::test]
    async fn enqueue_after_close_fails_closed() {
        let (handle, _rx) = ConnectionHandle::for_device(DeviceId::new("D1"), 8);
        assert!(handle.close());
        assert!(matches!(handle.enqueue("a"), Err(ChannelError::Closed)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (handle, _rx) = ConnectionHandle::for_device(DeviceId::new("D1"), 8);
        assert!(!handle.is_closed());
        assert!(handle.close());
        assert!(!handle.close());
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn close_signal_fires() {
        let (handle, _rx) = ConnectionHandle::for_device(DeviceId::new("D1"), 8);
        let mut signal = handle.close_signal();
        handle.close();
        assert!(signal.changed().await.is_ok());
        assert!(*signal.borrow());
    }

    #[tokio::test]
    async fn browser_identity_carries_user_and_session() {
        let session_id = SessionId::new();
        let (handle, _rx) =
            ConnectionHandle::for_browser(UserId::new("alice"), session_id, 8);
        match handle.identity() {
            ConnectionIdentity::Browser {
                user_id,
                session_id: sid,
            } => {
                assert_eq!(user_id.as_str(), "alice");
                assert_eq!(*sid, session_id);
            }
            ConnectionIdentity::Device(_) => panic!("expected browser identity"),
        }
    }
}
