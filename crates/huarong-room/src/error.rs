//! Error types for the room layer.

use huarong_protocol::{ConnectionId, ErrorCode, RoomId};

/// Reasons a room request is refused.
///
/// None of these are fatal. The coordinator turns them into an `error`
/// event for the requester via [`RoomError::code`] and `Display`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// Both player slots are taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The game in this room has already started.
    #[error("game in room {0} has already started")]
    AlreadyStarted(RoomId),

    /// The supplied password does not match.
    #[error("wrong password for room {0}")]
    WrongPassword(RoomId),

    /// The connection is not an occupant of the room.
    #[error("{0} is not in room {1}")]
    NotInRoom(ConnectionId, RoomId),

    /// The request does not fit the room's current status.
    #[error("room {room_id}: {reason}")]
    InvalidState { room_id: RoomId, reason: String },

    /// Every candidate code drawn was already taken.
    #[error("no free room code after {0} draws")]
    NoFreeCode(usize),

    /// The coordinator's mailbox is closed.
    #[error("room coordinator is unavailable")]
    Unavailable,
}

impl RoomError {
    /// The wire error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::RoomNotFound,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::AlreadyStarted(_) => ErrorCode::RoomAlreadyStarted,
            Self::WrongPassword(_) => ErrorCode::WrongPassword,
            Self::NotInRoom(..) => ErrorCode::NotInRoom,
            Self::InvalidState { .. } | Self::NoFreeCode(_) | Self::Unavailable => {
                ErrorCode::InvalidState
            }
        }
    }
}
