//! Transport layer for the Huarong room server.
//!
//! The coordinator only sees three things from the network: a
//! [`ConnectionId`] per client, the [`Frame`]s that client sends, and the
//! moment it goes away. [`Transport`] hands out [`Incoming`] sockets,
//! each of which upgrades into a [`Connection`] that moves frames.
//!
//! Accepting and upgrading are separate steps so the accept loop never
//! waits on one client's handshake.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod frame;
mod id;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use frame::Frame;
pub use id::ConnectionId;
#[cfg(feature = "websocket")]
pub use websocket::{
    HANDSHAKE_TIMEOUT, PendingWebSocket, WebSocketConnection, WebSocketTransport,
};

use std::net::SocketAddr;

/// A listener that produces client sockets.
pub trait Transport: Send + 'static {
    type Incoming: Incoming;

    /// Waits for the next client socket. Does not perform the handshake.
    async fn accept(&mut self) -> Result<Self::Incoming, TransportError>;

    /// The address clients connect to.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// An accepted socket that has not finished its handshake yet.
pub trait Incoming: Send + 'static {
    type Connection: Connection;

    fn peer_addr(&self) -> SocketAddr;

    /// Completes the handshake, giving up after a transport-defined timeout.
    async fn upgrade(self) -> Result<Self::Connection, TransportError>;
}

/// One client connection.
///
/// Methods take `&self` and may run concurrently: the server reads in one
/// task while a writer task pushes room events.
pub trait Connection: Send + Sync + 'static {
    /// Writes one frame to the peer.
    async fn send(&self, frame: Frame) -> Result<(), TransportError>;

    /// Writes a text frame.
    async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.send(Frame::from(text)).await
    }

    /// Reads the next data frame. `Ok(None)` means the peer closed cleanly.
    async fn recv(&self) -> Result<Option<Frame>, TransportError>;

    /// Starts a clean close.
    async fn close(&self) -> Result<(), TransportError>;

    fn id(&self) -> ConnectionId;
}
