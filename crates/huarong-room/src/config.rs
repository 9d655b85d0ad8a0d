//! Room configuration and status state machine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Hard ceiling on occupants: a room is a duel.
pub const MAX_MEMBERS: usize = 2;

/// Settings shared by every room a coordinator manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Length of generated room codes, at least 1.
    pub code_len: usize,

    /// Maximum occupants per room, at most [`MAX_MEMBERS`].
    pub max_members: usize,

    /// When `true`, `startGame`, `updateStatus`, `finishGame` and an
    /// explicit `leaveRoom` are only honoured from the room's occupants.
    /// When `false`, any connection naming an existing room may drive it.
    pub strict_membership: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            code_len: 4,
            max_members: 2,
            strict_membership: false,
        }
    }
}

impl RoomConfig {
    /// Pulls out-of-range values back into range. The table only ever
    /// runs with a normalized config.
    pub fn normalized(self) -> Self {
        Self {
            code_len: self.code_len.max(1),
            max_members: self.max_members.clamp(1, MAX_MEMBERS),
            ..self
        }
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The lifecycle status of a room.
///
/// ```text
/// Waiting ──startGame──→ Playing ──finishGame──→ Finished
/// ```
///
/// A room is created `Waiting` and never moves backwards. Leaving or
/// disconnecting deletes the room from any status; deletion is not a
/// status, the room is simply gone from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Returns `true` if the room still accepts players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// The only status reachable from this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Playing),
            Self::Playing => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Whether a waiting room shows up in the discovery list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    /// Joinable only by players who know the code.
    Private,
}

impl Visibility {
    pub fn from_public_flag(is_public: bool) -> Self {
        if is_public { Self::Public } else { Self::Private }
    }
}
