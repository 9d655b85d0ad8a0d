use std::net::SocketAddr;

use crate::ConnectionId;

/// Errors raised by a [`Transport`](crate::Transport) or one of its
/// connections.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The TCP connection opened but never became a WebSocket.
    #[error("handshake with {peer} failed: {reason}")]
    Handshake { peer: SocketAddr, reason: String },

    #[error("send to {0} failed: {1}")]
    Send(ConnectionId, String),

    #[error("receive from {0} failed: {1}")]
    Receive(ConnectionId, String),

    #[error("{0} is closed")]
    Closed(ConnectionId),
}
