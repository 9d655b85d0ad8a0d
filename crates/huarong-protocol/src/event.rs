//! The named events that travel between clients and the server.
//!
//! Inbound frames are decoded in two steps. First the envelope
//! (`{"event", "data"}`) is read as a [`RawEvent`]; then the payload is
//! checked against the shape its event name requires. A [`ClientEvent`]
//! that exists has already passed validation, so a missing `roomId` or a
//! null `layout` is rejected here and never reaches the coordinator.

use huarong_transport::ConnectionId;
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Number, Value};

use crate::{ErrorCode, ProtocolError, RoomId, RoomSummary};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A validated request from a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Open a new room with the sender as its only member.
    CreateRoom {
        password: Option<String>,
        is_public: bool,
    },

    /// Send the discovery list to the sender only.
    GetRooms,

    /// Take the free slot of a waiting room.
    JoinRoom {
        room_id: RoomId,
        password: Option<String>,
    },

    /// Move a room to `playing` with the given puzzle layout.
    StartGame {
        room_id: RoomId,
        layout: Value,
        size: Value,
    },

    /// Progress report, relayed to the opponent.
    UpdateStatus {
        room_id: RoomId,
        time: Number,
        steps: u64,
    },

    /// The sender solved the puzzle.
    FinishGame {
        room_id: RoomId,
        time: Number,
        steps: u64,
    },

    /// Leave a specific room, or whatever room the sender is in.
    LeaveRoom { room_id: Option<RoomId> },
}

impl ClientEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "createRoom",
            Self::GetRooms => "getRooms",
            Self::JoinRoom { .. } => "joinRoom",
            Self::StartGame { .. } => "startGame",
            Self::UpdateStatus { .. } => "updateStatus",
            Self::FinishGame { .. } => "finishGame",
            Self::LeaveRoom { .. } => "leaveRoom",
        }
    }
}

/// The undecoded envelope of an inbound frame.
#[derive(Debug, Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomData {
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRoomData {
    room_id: String,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartGameData {
    room_id: String,
    layout: Value,
    #[serde(default)]
    size: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressData {
    room_id: String,
    time: Number,
    steps: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaveRoomData {
    #[serde(default)]
    room_id: Option<String>,
}

impl<'de> Deserialize<'de> for ClientEvent {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let raw = RawEvent::deserialize(deserializer)?;
        Self::from_raw(raw).map_err(serde::de::Error::custom)
    }
}

impl ClientEvent {
    fn from_raw(raw: RawEvent) -> Result<Self, ProtocolError> {
        let RawEvent { event, data } = raw;
        match event.as_str() {
            "createRoom" => {
                let d: CreateRoomData = payload_or_default(&event, data)?;
                Ok(Self::CreateRoom {
                    password: non_empty(d.password),
                    is_public: d.is_public.unwrap_or(true),
                })
            }
            "getRooms" => Ok(Self::GetRooms),
            "joinRoom" => match data {
                // A bare string is shorthand for a room without password.
                Value::String(code) => Ok(Self::JoinRoom {
                    room_id: RoomId::parse(&code)?,
                    password: None,
                }),
                other => {
                    let d: JoinRoomData = payload(&event, other)?;
                    Ok(Self::JoinRoom {
                        room_id: RoomId::parse(&d.room_id)?,
                        password: non_empty(d.password),
                    })
                }
            },
            "startGame" => {
                let d: StartGameData = payload(&event, data)?;
                if d.layout.is_null() {
                    return Err(ProtocolError::InvalidMessage(
                        "startGame: layout must not be null".into(),
                    ));
                }
                Ok(Self::StartGame {
                    room_id: RoomId::parse(&d.room_id)?,
                    layout: d.layout,
                    size: d.size,
                })
            }
            "updateStatus" => {
                let d: ProgressData = payload(&event, data)?;
                Ok(Self::UpdateStatus {
                    room_id: RoomId::parse(&d.room_id)?,
                    time: d.time,
                    steps: d.steps,
                })
            }
            "finishGame" => {
                let d: ProgressData = payload(&event, data)?;
                Ok(Self::FinishGame {
                    room_id: RoomId::parse(&d.room_id)?,
                    time: d.time,
                    steps: d.steps,
                })
            }
            "leaveRoom" => {
                let d: LeaveRoomData = payload_or_default(&event, data)?;
                let room_id = match d.room_id.as_deref().map(str::trim) {
                    Some(code) if !code.is_empty() => {
                        Some(RoomId::parse(code)?)
                    }
                    _ => None,
                };
                Ok(Self::LeaveRoom { room_id })
            }
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown event `{other}`"
            ))),
        }
    }
}

fn payload<T: DeserializeOwned>(
    event: &str,
    data: Value,
) -> Result<T, ProtocolError> {
    if data.is_null() {
        return Err(ProtocolError::InvalidMessage(format!(
            "{event}: missing data"
        )));
    }
    serde_json::from_value(data)
        .map_err(|e| ProtocolError::InvalidMessage(format!("{event}: {e}")))
}

/// Like [`payload`], but an absent or null `data` yields `T::default()`.
fn payload_or_default<T: DeserializeOwned + Default>(
    event: &str,
    data: Value,
) -> Result<T, ProtocolError> {
    if data.is_null() {
        return Ok(T::default());
    }
    payload(event, data)
}

fn non_empty(password: Option<String>) -> Option<String> {
    password.filter(|p| !p.is_empty())
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// An event pushed from the server to one or more clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// First frame on every connection: the client's own identifier.
    Connected { id: ConnectionId },

    /// Reply to `createRoom`.
    RoomCreated {
        room_id: RoomId,
        players: Vec<ConnectionId>,
    },

    /// The discovery list, as a reply to `getRooms` or as a broadcast.
    RoomList(Vec<RoomSummary>),

    /// Membership of a room changed; sent to every occupant.
    PlayerJoined {
        room_id: RoomId,
        players: Vec<ConnectionId>,
    },

    /// The room moved to `playing`.
    GameStarted { layout: Value, size: Value },

    /// The opponent's latest progress.
    OpponentUpdate { time: Number, steps: u64 },

    /// Someone finished first.
    GameEnded {
        winner_id: ConnectionId,
        winner_time: Number,
        winner_steps: u64,
    },

    /// The other occupant left or dropped; the room is gone.
    OpponentDisconnected,

    /// A request from this connection was rejected.
    Error { code: ErrorCode, message: String },
}

impl ServerEvent {
    /// Builds an `error` event.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::RoomCreated { .. } => "roomCreated",
            Self::RoomList(_) => "roomList",
            Self::PlayerJoined { .. } => "playerJoined",
            Self::GameStarted { .. } => "gameStarted",
            Self::OpponentUpdate { .. } => "opponentUpdate",
            Self::GameEnded { .. } => "gameEnded",
            Self::OpponentDisconnected => "opponentDisconnected",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Result<ClientEvent, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn test_create_room_without_data_is_public_and_open() {
        let event = decode(json!({"event": "createRoom"})).unwrap();
        assert_eq!(
            event,
            ClientEvent::CreateRoom {
                password: None,
                is_public: true
            }
        );
    }

    #[test]
    fn test_create_room_empty_password_means_none() {
        let event = decode(json!({
            "event": "createRoom",
            "data": {"password": "", "isPublic": false}
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::CreateRoom {
                password: None,
                is_public: false
            }
        );
    }

    #[test]
    fn test_join_room_accepts_bare_string() {
        let event =
            decode(json!({"event": "joinRoom", "data": "ab12"})).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room_id: RoomId::new("AB12"),
                password: None
            }
        );
    }

    #[test]
    fn test_join_room_accepts_object_with_password() {
        let event = decode(json!({
            "event": "joinRoom",
            "data": {"roomId": "AB12", "password": "xyz"}
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room_id: RoomId::new("AB12"),
                password: Some("xyz".into())
            }
        );
    }

    #[test]
    fn test_join_room_without_room_id_is_rejected() {
        let err = decode(json!({"event": "joinRoom", "data": {"password": "x"}}))
            .unwrap_err();
        assert!(err.to_string().contains("roomId"), "got: {err}");
        assert!(decode(json!({"event": "joinRoom"})).is_err());
        assert!(decode(json!({"event": "joinRoom", "data": "  "})).is_err());
    }

    #[test]
    fn test_start_game_requires_layout() {
        assert!(
            decode(json!({"event": "startGame", "data": {"roomId": "AB12"}}))
                .is_err()
        );
        assert!(
            decode(json!({
                "event": "startGame",
                "data": {"roomId": "AB12", "layout": null}
            }))
            .is_err()
        );

        let event = decode(json!({
            "event": "startGame",
            "data": {"roomId": "AB12", "layout": [[1, 1], [0, 2]], "size": 4}
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::StartGame {
                room_id: RoomId::new("AB12"),
                layout: json!([[1, 1], [0, 2]]),
                size: json!(4),
            }
        );
    }

    #[test]
    fn test_progress_events_require_numbers() {
        let ok = decode(json!({
            "event": "updateStatus",
            "data": {"roomId": "AB12", "time": 12.5, "steps": 7}
        }))
        .unwrap();
        assert_eq!(ok.name(), "updateStatus");

        assert!(
            decode(json!({
                "event": "finishGame",
                "data": {"roomId": "AB12", "time": "soon", "steps": 7}
            }))
            .is_err()
        );
        assert!(
            decode(json!({
                "event": "finishGame",
                "data": {"roomId": "AB12", "time": 3, "steps": -1}
            }))
            .is_err()
        );
    }

    #[test]
    fn test_time_keeps_its_written_form_through_a_relay() {
        for written in ["1e3", "12.50", "7", "0.1"] {
            let frame = format!(
                r#"{{"event":"updateStatus","data":{{"roomId":"AB12","time":{written},"steps":1}}}}"#
            );
            let ClientEvent::UpdateStatus { time, steps, .. } =
                serde_json::from_str::<ClientEvent>(&frame).unwrap()
            else {
                panic!("expected updateStatus");
            };

            let relayed =
                serde_json::to_string(&ServerEvent::OpponentUpdate { time, steps })
                    .unwrap();
            assert_eq!(
                relayed,
                format!(r#"{{"event":"opponentUpdate","data":{{"time":{written},"steps":1}}}}"#)
            );
        }
    }

    #[test]
    fn test_leave_room_room_id_is_optional() {
        assert_eq!(
            decode(json!({"event": "leaveRoom"})).unwrap(),
            ClientEvent::LeaveRoom { room_id: None }
        );
        assert_eq!(
            decode(json!({"event": "leaveRoom", "data": {"roomId": ""}}))
                .unwrap(),
            ClientEvent::LeaveRoom { room_id: None }
        );
        assert_eq!(
            decode(json!({"event": "leaveRoom", "data": {"roomId": "ab12"}}))
                .unwrap(),
            ClientEvent::LeaveRoom {
                room_id: Some(RoomId::new("AB12"))
            }
        );
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let err = decode(json!({"event": "flyToMoon"})).unwrap_err();
        assert!(err.to_string().contains("flyToMoon"));
    }

    #[test]
    fn test_server_event_json_shapes() {
        let joined = ServerEvent::PlayerJoined {
            room_id: RoomId::new("AB12"),
            players: vec![ConnectionId::new(1), ConnectionId::new(2)],
        };
        assert_eq!(
            serde_json::to_value(&joined).unwrap(),
            json!({"event": "playerJoined", "data": {"roomId": "AB12", "players": [1, 2]}})
        );

        let ended = ServerEvent::GameEnded {
            winner_id: ConnectionId::new(2),
            winner_time: Number::from(42),
            winner_steps: 81,
        };
        assert_eq!(
            serde_json::to_value(&ended).unwrap(),
            json!({"event": "gameEnded", "data": {"winnerId": 2, "winnerTime": 42, "winnerSteps": 81}})
        );

        let list = ServerEvent::RoomList(vec![]);
        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({"event": "roomList", "data": []})
        );

        let err = ServerEvent::error(ErrorCode::WrongPassword, "wrong password");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"event": "error", "data": {"code": "wrongPassword", "message": "wrong password"}})
        );
    }

    #[test]
    fn test_server_event_decodes_for_clients() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"event":"opponentDisconnected"}"#).unwrap();
        assert_eq!(event, ServerEvent::OpponentDisconnected);
        assert_eq!(event.name(), "opponentDisconnected");
    }
}
