//! Wire protocol for the Huarong room server.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): one enum variant per
//!   named event. Inbound payloads are validated while decoding, so the
//!   coordinator only ever sees well-formed requests.
//! - **Types** ([`RoomId`], [`RoomSummary`], [`Recipient`], [`ErrorCode`]).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, events out.
//! - **Errors** ([`ProtocolError`]).
//!
//! Every frame is a JSON object of the form
//! `{"event": "<name>", "data": <payload>}`.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEvent) → Room coordinator
//! ```

mod codec;
mod error;
mod event;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use event::{ClientEvent, ServerEvent};
pub use types::{ErrorCode, Recipient, RoomId, RoomSummary};

pub use huarong_transport::ConnectionId;
