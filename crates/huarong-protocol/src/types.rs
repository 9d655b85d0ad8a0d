//! Identity, addressing, and summary types shared by every layer.

use std::fmt;

use huarong_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// RoomId
// ---------------------------------------------------------------------------

/// A short, human-typeable room code such as `AB12`.
///
/// Codes are generated upper-case. Anything a client types goes through
/// [`RoomId::parse`], which trims and upper-cases it, so `" ab12"` and
/// `"AB12"` name the same room.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps an already-normalized code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Normalizes client input into a room id.
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidMessage` if the input is blank.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim();
        if code.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "roomId must not be empty".into(),
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomSummary
// ---------------------------------------------------------------------------

/// One entry of the discovery list.
///
/// Deliberately carries no layout and no password value, only whether one
/// is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub player_count: usize,
    pub has_password: bool,
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who a server event is addressed to.
///
/// Coordinator operations return `(Recipient, ServerEvent)` pairs and the
/// caller turns them into transport sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// A single connection, usually the requester.
    One(ConnectionId),

    /// A set of connections, e.g. a room's occupants or the room minus the
    /// sender.
    Many(Vec<ConnectionId>),

    /// Every live connection, occupant or not.
    Everyone,
}

impl Recipient {
    /// Returns `true` if `conn` is addressed. Always `true` for `Everyone`.
    pub fn includes(&self, conn: ConnectionId) -> bool {
        match self {
            Self::One(id) => *id == conn,
            Self::Many(ids) => ids.contains(&conn),
            Self::Everyone => true,
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable reason carried by every `error` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    /// `joinRoom` named a room that does not exist.
    RoomNotFound,
    /// The room already holds two players.
    RoomFull,
    /// The room left `waiting`.
    RoomAlreadyStarted,
    /// The room has a password and the supplied one did not match.
    WrongPassword,
    /// The frame could not be decoded or was missing required fields.
    BadRequest,
    /// The sender is not an occupant of the room it addressed.
    NotInRoom,
    /// The request is not valid in the room's current status.
    InvalidState,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RoomNotFound => "roomNotFound",
            Self::RoomFull => "roomFull",
            Self::RoomAlreadyStarted => "roomAlreadyStarted",
            Self::WrongPassword => "wrongPassword",
            Self::BadRequest => "badRequest",
            Self::NotInRoom => "notInRoom",
            Self::InvalidState => "invalidState",
        };
        f.write_str(s)
    }
}
