//! # Huarong
//!
//! Room coordinator server for two-player sliding-puzzle duels.
//!
//! Clients connect over WebSocket and exchange `{"event", "data"}` JSON
//! frames. The server pairs them into two-seat rooms identified by short
//! codes, relays the starting layout and live progress between the two
//! occupants, declares the first finisher the winner, and keeps every
//! client's room list current.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use huarong::prelude::*;
//!
//! # async fn start() -> Result<(), HuarongError> {
//! let server = HuarongServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::HuarongError;
pub use server::{DEFAULT_MAILBOX_SIZE, HuarongServer, HuarongServerBuilder};

pub mod prelude {
    pub use crate::{
        ConfigError, HuarongError, HuarongServer, HuarongServerBuilder,
        ServerConfig,
    };
    pub use huarong_protocol::{
        ClientEvent, ConnectionId, ErrorCode, RoomId, RoomSummary,
        ServerEvent,
    };
    pub use huarong_room::{RoomConfig, RoomError, RoomStatus};
}
