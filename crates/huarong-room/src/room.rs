//! A single two-player room and where its code comes from.

use std::collections::VecDeque;

use huarong_protocol::{ConnectionId, RoomId, RoomSummary};
use rand::Rng;
use serde_json::Value;

use crate::{RoomError, RoomStatus, Visibility};

/// Characters a room code is drawn from.
const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

// ---------------------------------------------------------------------------
// RoomCodes
// ---------------------------------------------------------------------------

/// Source of candidate room codes.
///
/// The table asks for a new candidate until it gets one that no live room
/// uses, so an implementation does not need to track uniqueness itself.
pub trait RoomCodes: Send + 'static {
    /// Returns a candidate code of `len` characters.
    fn next_code(&mut self, len: usize) -> RoomId;
}

/// Uniformly random codes from `[0-9A-Z]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodes;

impl RoomCodes for RandomCodes {
    fn next_code(&mut self, len: usize) -> RoomId {
        let mut rng = rand::rng();
        let code: String = (0..len)
            .map(|_| {
                CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char
            })
            .collect();
        RoomId::new(code)
    }
}

/// Hands out a fixed list of codes, then falls back to random ones.
///
/// Used where a predictable code matters, such as tests and demos.
#[derive(Debug, Clone, Default)]
pub struct SequenceCodes {
    queue: VecDeque<RoomId>,
}

impl SequenceCodes {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: codes.into_iter().map(RoomId::new).collect(),
        }
    }
}

impl RoomCodes for SequenceCodes {
    fn next_code(&mut self, len: usize) -> RoomId {
        self.queue
            .pop_front()
            .unwrap_or_else(|| RandomCodes.next_code(len))
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One session between (at most) two connections.
///
/// Fields are private: membership goes through the table, which also keeps
/// its connection index in sync, and status only moves through
/// [`start`](Room::start) and [`finish`](Room::finish).
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    /// Join order; never contains duplicates.
    members: Vec<ConnectionId>,
    status: RoomStatus,
    /// `Some` exactly when `status != Waiting`.
    layout: Option<Value>,
    password: Option<String>,
    visibility: Visibility,
    /// Creation order, used to keep the discovery list stable.
    seq: u64,
}

impl Room {
    pub(crate) fn new(
        id: RoomId,
        creator: ConnectionId,
        password: Option<String>,
        visibility: Visibility,
        seq: u64,
    ) -> Self {
        Self {
            id,
            members: vec![creator],
            status: RoomStatus::Waiting,
            layout: None,
            password,
            visibility,
            seq,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn members(&self) -> &[ConnectionId] {
        &self.members
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn layout(&self) -> Option<&Value> {
        self.layout.as_ref()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_member(&self, conn: ConnectionId) -> bool {
        self.members.contains(&conn)
    }

    /// Every occupant except `conn`.
    pub fn others(&self, conn: ConnectionId) -> Vec<ConnectionId> {
        self.members.iter().copied().filter(|m| *m != conn).collect()
    }

    /// Returns `true` if this room belongs in the discovery list.
    pub fn is_listed(&self) -> bool {
        self.status.is_joinable() && self.visibility == Visibility::Public
    }

    /// Exact comparison; an open room accepts anything.
    pub fn password_matches(&self, supplied: Option<&str>) -> bool {
        match &self.password {
            None => true,
            Some(expected) => supplied == Some(expected.as_str()),
        }
    }

    pub(crate) fn add_member(&mut self, conn: ConnectionId) {
        if !self.is_member(conn) {
            self.members.push(conn);
        }
    }

    /// `waiting → playing`, storing the layout.
    pub(crate) fn start(&mut self, layout: Value) -> Result<(), RoomError> {
        if !self.status.can_transition_to(RoomStatus::Playing) {
            return Err(RoomError::AlreadyStarted(self.id.clone()));
        }
        self.layout = Some(layout);
        self.status = RoomStatus::Playing;
        Ok(())
    }

    /// `playing → finished`.
    pub(crate) fn finish(&mut self) -> Result<(), RoomError> {
        if !self.status.can_transition_to(RoomStatus::Finished) {
            let reason = match self.status {
                RoomStatus::Waiting => "game has not started",
                _ => "game already finished",
            };
            return Err(RoomError::InvalidState {
                room_id: self.id.clone(),
                reason: reason.into(),
            });
        }
        self.status = RoomStatus::Finished;
        Ok(())
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            player_count: self.members.len(),
            has_password: self.has_password(),
        }
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id.clone(),
            members: self.members.clone(),
            status: self.status,
            visibility: self.visibility,
            has_password: self.has_password(),
            has_layout: self.layout.is_some(),
        }
    }
}

/// A read-only snapshot of a room, for inspection and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub id: RoomId,
    pub members: Vec<ConnectionId>,
    pub status: RoomStatus,
    pub visibility: Visibility,
    pub has_password: bool,
    pub has_layout: bool,
}
