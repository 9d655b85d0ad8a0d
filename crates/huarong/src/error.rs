//! Unified error type for the server.

use huarong_protocol::ProtocolError;
use huarong_room::RoomError;
use huarong_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps every layer's error.
///
/// `#[from]` on each variant lets `?` convert layer errors directly.
#[derive(Debug, thiserror::Error)]
pub enum HuarongError {
    /// Bind, accept, send or receive failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The coordinator refused or could not take a request.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The environment held an invalid setting.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
