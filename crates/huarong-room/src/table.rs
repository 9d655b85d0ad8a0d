//! The room table: every room and which connection sits in which one.
//!
//! All coordinator rules live here, as synchronous methods that mutate the
//! table and return an [`Outbox`]. Nothing in this module touches the
//! network; the actor in `coordinator.rs` delivers the outbox.
//!
//! Each mutating operation ends with exactly one discovery broadcast
//! (`Everyone ← roomList`), placed after its other effects. An operation
//! that evicts the caller from a previous room and then creates or joins
//! another one still broadcasts once.

use std::collections::HashMap;

use huarong_protocol::{
    ClientEvent, ConnectionId, Recipient, RoomId, RoomSummary, ServerEvent,
};
use serde_json::{Number, Value};

use crate::{
    RandomCodes, Room, RoomCodes, RoomConfig, RoomError, RoomInfo,
    Visibility,
};

/// Candidate codes drawn before a room creation gives up.
pub const MAX_CODE_DRAWS: usize = 256;

/// Draws made at one length before the next candidates get a character
/// longer.
const DRAWS_PER_LENGTH: usize = 64;

/// Side effects produced by one table operation, in delivery order.
pub type Outbox = Vec<(Recipient, ServerEvent)>;

/// All live rooms plus an index from connection to room.
///
/// Invariants, upheld by every method:
/// - a connection is a member of at most one room, and `memberships`
///   agrees with the rooms' member lists;
/// - no room has more than `config.max_members` members;
/// - a room never outlives its last member.
pub struct RoomTable<S: RoomCodes = RandomCodes> {
    rooms: HashMap<RoomId, Room>,
    memberships: HashMap<ConnectionId, RoomId>,
    config: RoomConfig,
    codes: S,
    next_seq: u64,
}

impl RoomTable<RandomCodes> {
    /// Creates an empty table with random room codes.
    pub fn new(config: RoomConfig) -> Self {
        Self::with_codes(config, RandomCodes)
    }
}

impl Default for RoomTable<RandomCodes> {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

impl<S: RoomCodes> RoomTable<S> {
    /// Creates an empty table drawing room codes from `codes`.
    ///
    /// Out-of-range settings are clamped, see [`RoomConfig::normalized`].
    pub fn with_codes(config: RoomConfig, codes: S) -> Self {
        Self {
            rooms: HashMap::new(),
            memberships: HashMap::new(),
            config: config.normalized(),
            codes,
            next_seq: 0,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Applies one client event and returns its side effects.
    pub fn apply(&mut self, from: ConnectionId, event: ClientEvent) -> Outbox {
        match event {
            ClientEvent::CreateRoom {
                password,
                is_public,
            } => self.create_room(
                from,
                password,
                Visibility::from_public_flag(is_public),
            ),
            ClientEvent::GetRooms => self.get_rooms(from),
            ClientEvent::JoinRoom { room_id, password } => {
                self.join_room(from, &room_id, password.as_deref())
            }
            ClientEvent::StartGame {
                room_id,
                layout,
                size,
            } => self.start_game(from, &room_id, layout, size),
            ClientEvent::UpdateStatus {
                room_id,
                time,
                steps,
            } => self.update_status(from, &room_id, time, steps),
            ClientEvent::FinishGame {
                room_id,
                time,
                steps,
            } => self.finish_game(from, &room_id, time, steps),
            ClientEvent::LeaveRoom { room_id } => {
                self.leave_room(from, room_id.as_ref())
            }
        }
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// Opens a waiting room with `conn` as its only member, after
    /// removing `conn` from any room it was already in.
    pub fn create_room(
        &mut self,
        conn: ConnectionId,
        password: Option<String>,
        visibility: Visibility,
    ) -> Outbox {
        let mut out = Outbox::new();
        let evicted = self.evict(conn, &mut out);

        let room_id = match self.fresh_code() {
            Ok(room_id) => room_id,
            Err(err) => {
                tracing::warn!(%conn, error = %err, "room creation failed");
                out.push(error_to(conn, &err));
                if evicted {
                    out.push(self.discovery_broadcast());
                }
                return out;
            }
        };
        let seq = self.next_seq;
        self.next_seq += 1;

        let room = Room::new(room_id.clone(), conn, password, visibility, seq);
        tracing::info!(
            %room_id,
            creator = %conn,
            locked = room.has_password(),
            ?visibility,
            "room created"
        );
        let players = room.members().to_vec();
        self.rooms.insert(room_id.clone(), room);
        self.memberships.insert(conn, room_id.clone());

        out.push((
            Recipient::One(conn),
            ServerEvent::RoomCreated { room_id, players },
        ));
        out.push(self.discovery_broadcast());
        out
    }

    /// Replies to `conn` alone with the current discovery list.
    pub fn get_rooms(&self, conn: ConnectionId) -> Outbox {
        vec![(
            Recipient::One(conn),
            ServerEvent::RoomList(self.discovery_snapshot()),
        )]
    }

    /// Puts `conn` into the free slot of `room_id`.
    ///
    /// `conn` leaves its current room first, even if the join then fails.
    pub fn join_room(
        &mut self,
        conn: ConnectionId,
        room_id: &RoomId,
        password: Option<&str>,
    ) -> Outbox {
        let mut out = Outbox::new();
        let evicted = self.evict(conn, &mut out);

        tracing::debug!(%conn, %room_id, "join attempt");
        match self.try_join(conn, room_id, password) {
            Ok(JoinOutcome::Joined(players)) => {
                tracing::info!(
                    %room_id,
                    %conn,
                    players = players.len(),
                    "player joined"
                );
                out.push((
                    Recipient::Many(players.clone()),
                    ServerEvent::PlayerJoined {
                        room_id: room_id.clone(),
                        players,
                    },
                ));
                out.push(self.discovery_broadcast());
            }
            Ok(JoinOutcome::AlreadyMember(players)) => {
                tracing::debug!(%room_id, %conn, "join ignored, already a member");
                out.push((
                    Recipient::One(conn),
                    ServerEvent::PlayerJoined {
                        room_id: room_id.clone(),
                        players,
                    },
                ));
                if evicted {
                    out.push(self.discovery_broadcast());
                }
            }
            Err(err) => {
                tracing::debug!(%room_id, %conn, error = %err, "join failed");
                out.push(error_to(conn, &err));
                if evicted {
                    out.push(self.discovery_broadcast());
                }
            }
        }
        out
    }

    /// Moves `room_id` to `playing` and sends the layout to its occupants.
    ///
    /// An unknown room is ignored.
    pub fn start_game(
        &mut self,
        conn: ConnectionId,
        room_id: &RoomId,
        layout: Value,
        size: Value,
    ) -> Outbox {
        let strict = self.config.strict_membership;
        let Some(room) = self.rooms.get_mut(room_id) else {
            tracing::debug!(%conn, %room_id, "startGame for unknown room ignored");
            return Outbox::new();
        };
        if strict && !room.is_member(conn) {
            return vec![error_to(conn, &RoomError::NotInRoom(conn, room_id.clone()))];
        }
        if let Err(err) = room.start(layout.clone()) {
            tracing::debug!(%conn, %room_id, error = %err, "startGame rejected");
            return vec![error_to(conn, &err)];
        }
        tracing::info!(
            %room_id,
            started_by = %conn,
            players = room.members().len(),
            "game started"
        );

        let occupants = room.members().to_vec();
        vec![
            (
                Recipient::Many(occupants),
                ServerEvent::GameStarted { layout, size },
            ),
            self.discovery_broadcast(),
        ]
    }

    /// Relays `conn`'s progress to the other occupant. No state changes.
    pub fn update_status(
        &self,
        conn: ConnectionId,
        room_id: &RoomId,
        time: Number,
        steps: u64,
    ) -> Outbox {
        let Some(room) = self.rooms.get(room_id) else {
            tracing::debug!(%conn, %room_id, "updateStatus for unknown room ignored");
            return Outbox::new();
        };
        if self.config.strict_membership && !room.is_member(conn) {
            return vec![error_to(conn, &RoomError::NotInRoom(conn, room_id.clone()))];
        }
        let others = room.others(conn);
        if others.is_empty() {
            return Outbox::new();
        }
        vec![(
            Recipient::Many(others),
            ServerEvent::OpponentUpdate { time, steps },
        )]
    }

    /// Ends the game with `conn` as the winner.
    ///
    /// The room stays in the table as `finished` until someone leaves or
    /// disconnects, so both players can still see the result.
    pub fn finish_game(
        &mut self,
        conn: ConnectionId,
        room_id: &RoomId,
        time: Number,
        steps: u64,
    ) -> Outbox {
        let strict = self.config.strict_membership;
        let Some(room) = self.rooms.get_mut(room_id) else {
            tracing::debug!(%conn, %room_id, "finishGame for unknown room ignored");
            return Outbox::new();
        };
        if strict && !room.is_member(conn) {
            return vec![error_to(conn, &RoomError::NotInRoom(conn, room_id.clone()))];
        }
        if let Err(err) = room.finish() {
            tracing::debug!(%conn, %room_id, error = %err, "finishGame rejected");
            return vec![error_to(conn, &err)];
        }
        tracing::info!(%room_id, winner = %conn, steps, "game finished");

        let occupants = room.members().to_vec();
        vec![
            (
                Recipient::Many(occupants),
                ServerEvent::GameEnded {
                    winner_id: conn,
                    winner_time: time,
                    winner_steps: steps,
                },
            ),
            self.discovery_broadcast(),
        ]
    }

    /// Deletes `room_id` if given and present, otherwise every room `conn`
    /// is in. The remaining occupant is told its opponent is gone.
    pub fn leave_room(
        &mut self,
        conn: ConnectionId,
        room_id: Option<&RoomId>,
    ) -> Outbox {
        let mut out = Outbox::new();
        let target = room_id.filter(|id| {
            self.rooms.get(*id).is_some_and(|room| {
                !self.config.strict_membership || room.is_member(conn)
            })
        });

        match target {
            Some(id) => {
                self.delete_room(id, conn, &mut out);
                tracing::info!(room_id = %id, %conn, "room deleted on leave");
            }
            None => {
                self.evict(conn, &mut out);
            }
        }
        out.push(self.discovery_broadcast());
        out
    }

    /// Removes `conn` from the table after its connection went away.
    ///
    /// Safe to call for a connection that is in no room.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Outbox {
        let mut out = Outbox::new();
        self.evict(conn, &mut out);
        out.push(self.discovery_broadcast());
        out
    }

    // -----------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------

    /// The public, waiting rooms, in creation order.
    pub fn discovery_snapshot(&self) -> Vec<RoomSummary> {
        let mut listed: Vec<&Room> =
            self.rooms.values().filter(|r| r.is_listed()).collect();
        listed.sort_by_key(|r| r.seq());
        listed.into_iter().map(Room::summary).collect()
    }

    fn discovery_broadcast(&self) -> (Recipient, ServerEvent) {
        let snapshot = self.discovery_snapshot();
        tracing::debug!(listed = snapshot.len(), "broadcasting room list");
        (Recipient::Everyone, ServerEvent::RoomList(snapshot))
    }

    // -----------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------

    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// The room `conn` currently occupies, if any.
    pub fn room_of(&self, conn: ConnectionId) -> Option<&RoomId> {
        self.memberships.get(&conn)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Snapshots of every room, in creation order.
    pub fn infos(&self) -> Vec<RoomInfo> {
        let mut rooms: Vec<&Room> = self.rooms.values().collect();
        rooms.sort_by_key(|r| r.seq());
        rooms.into_iter().map(Room::info).collect()
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn try_join(
        &mut self,
        conn: ConnectionId,
        room_id: &RoomId,
        password: Option<&str>,
    ) -> Result<JoinOutcome, RoomError> {
        let max = self.config.max_members;
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        if room.is_member(conn) {
            return Ok(JoinOutcome::AlreadyMember(room.members().to_vec()));
        }
        if room.members().len() >= max {
            return Err(RoomError::RoomFull(room_id.clone()));
        }
        if !room.status().is_joinable() {
            return Err(RoomError::AlreadyStarted(room_id.clone()));
        }
        if !room.password_matches(password) {
            return Err(RoomError::WrongPassword(room_id.clone()));
        }

        room.add_member(conn);
        let players = room.members().to_vec();
        self.memberships.insert(conn, room_id.clone());
        Ok(JoinOutcome::Joined(players))
    }

    /// Deletes the room `conn` is in, if any, notifying the other occupant.
    ///
    /// Returns `true` if a room was deleted. Does not broadcast.
    fn evict(&mut self, conn: ConnectionId, out: &mut Outbox) -> bool {
        let Some(room_id) = self.memberships.get(&conn).cloned() else {
            return false;
        };
        self.delete_room(&room_id, conn, out);
        tracing::info!(%room_id, %conn, "room deleted, player left or disconnected");
        true
    }

    /// Removes a room and all of its memberships, telling every occupant
    /// except `leaver` that the opponent is gone.
    fn delete_room(
        &mut self,
        room_id: &RoomId,
        leaver: ConnectionId,
        out: &mut Outbox,
    ) {
        let Some(room) = self.rooms.remove(room_id) else {
            return;
        };
        for member in room.members() {
            self.memberships.remove(member);
        }
        let others = room.others(leaver);
        if !others.is_empty() {
            out.push((Recipient::Many(others), ServerEvent::OpponentDisconnected));
        }
    }

    /// Draws until a code no live room uses. Candidates grow one character
    /// longer every [`DRAWS_PER_LENGTH`] misses; after [`MAX_CODE_DRAWS`]
    /// the caller gets an error instead of a stalled coordinator.
    fn fresh_code(&mut self) -> Result<RoomId, RoomError> {
        for draw in 0..MAX_CODE_DRAWS {
            let len = self.config.code_len + draw / DRAWS_PER_LENGTH;
            let code = self.codes.next_code(len);
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
            tracing::debug!(%code, draw, "room code collision, drawing again");
        }
        Err(RoomError::NoFreeCode(MAX_CODE_DRAWS))
    }
}

enum JoinOutcome {
    Joined(Vec<ConnectionId>),
    AlreadyMember(Vec<ConnectionId>),
}

fn error_to(conn: ConnectionId, err: &RoomError) -> (Recipient, ServerEvent) {
    (
        Recipient::One(conn),
        ServerEvent::error(err.code(), err.to_string()),
    )
}
