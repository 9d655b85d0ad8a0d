//! The room coordinator: creates, joins, and tears down two-player rooms
//! and fans room events out to connected clients.
//!
//! The work is split in two:
//!
//! - [`RoomTable`] is plain synchronous state. Each operation mutates the
//!   table and returns an [`Outbox`] of `(Recipient, ServerEvent)` side
//!   effects without doing any I/O, which makes it easy to test.
//! - The coordinator actor ([`spawn_coordinator`]) owns one table plus the
//!   registry of connected clients, processes one command at a time from
//!   its mailbox, and delivers each outbox. [`CoordinatorHandle`] is the
//!   only way in.
//!
//! # Key types
//!
//! - [`RoomStatus`]: `waiting → playing → finished` state machine
//! - [`Room`]: one session with its members, status, layout, password, visibility
//! - [`RoomConfig`]: code length, capacity, membership strictness
//! - [`RoomCodes`]: where room codes come from ([`RandomCodes`] by default)

mod config;
mod coordinator;
mod error;
mod room;
mod table;

pub use config::{MAX_MEMBERS, RoomConfig, RoomStatus, Visibility};
pub use coordinator::{
    CLIENT_QUEUE_SIZE, ClientSender, CoordinatorHandle, spawn_coordinator,
};
pub use error::RoomError;
pub use room::{RandomCodes, Room, RoomCodes, RoomInfo, SequenceCodes};
pub use table::{MAX_CODE_DRAWS, Outbox, RoomTable};
