//! Integration tests for the coordinator actor, using real channels in
//! place of network connections.

use std::time::Duration;

use huarong_protocol::{
    ClientEvent, ConnectionId, ErrorCode, RoomId, ServerEvent,
};
use huarong_room::{
    CLIENT_QUEUE_SIZE, CoordinatorHandle, RoomConfig, RoomStatus, SequenceCodes,
    spawn_coordinator,
};
use serde_json::{Number, json};
use tokio::sync::mpsc;

type Inbox = mpsc::Receiver<ServerEvent>;

fn conn(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

fn coordinator() -> CoordinatorHandle {
    spawn_coordinator(
        RoomConfig::default(),
        SequenceCodes::new(["AB12", "CD34"]),
        64,
    )
}

async fn client(handle: &CoordinatorHandle, id: u64) -> Inbox {
    let (tx, rx) = mpsc::channel(CLIENT_QUEUE_SIZE);
    handle.connect(conn(id), tx).await.unwrap();
    rx
}

/// Waits for the next event that is not a discovery broadcast.
async fn next_non_list(rx: &mut Inbox) -> ServerEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("channel closed");
        if !matches!(event, ServerEvent::RoomList(_)) {
            return event;
        }
    }
}

/// Lets the actor drain its mailbox: `rooms()` is answered only after
/// every command queued before it.
async fn settle(handle: &CoordinatorHandle) {
    handle.rooms().await.unwrap();
}

fn drain(rx: &mut Inbox) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_create_join_start_scenario() {
    let handle = coordinator();
    let mut c1 = client(&handle, 1).await;
    let mut c2 = client(&handle, 2).await;
    let mut c3 = client(&handle, 3).await;

    handle
        .submit(conn(1), ClientEvent::CreateRoom { password: None, is_public: true })
        .await
        .unwrap();
    assert_eq!(
        next_non_list(&mut c1).await,
        ServerEvent::RoomCreated {
            room_id: RoomId::new("AB12"),
            players: vec![conn(1)],
        }
    );

    handle
        .submit(
            conn(2),
            ClientEvent::JoinRoom { room_id: RoomId::new("AB12"), password: None },
        )
        .await
        .unwrap();
    let joined = ServerEvent::PlayerJoined {
        room_id: RoomId::new("AB12"),
        players: vec![conn(1), conn(2)],
    };
    assert_eq!(next_non_list(&mut c1).await, joined);
    assert_eq!(next_non_list(&mut c2).await, joined);

    handle
        .submit(
            conn(1),
            ClientEvent::StartGame {
                room_id: RoomId::new("AB12"),
                layout: json!({"grid": "5x4"}),
                size: json!(4),
            },
        )
        .await
        .unwrap();
    assert!(matches!(next_non_list(&mut c1).await, ServerEvent::GameStarted { .. }));
    assert!(matches!(next_non_list(&mut c2).await, ServerEvent::GameStarted { .. }));

    settle(&handle).await;
    drain(&mut c3);
    handle.submit(conn(3), ClientEvent::GetRooms).await.unwrap();
    settle(&handle).await;
    assert_eq!(drain(&mut c3), vec![ServerEvent::RoomList(vec![])]);
}

#[tokio::test]
async fn test_broadcast_reaches_non_occupants() {
    let handle = coordinator();
    let _c1 = client(&handle, 1).await;
    let mut watcher = client(&handle, 2).await;

    handle
        .submit(conn(1), ClientEvent::CreateRoom { password: None, is_public: true })
        .await
        .unwrap();
    settle(&handle).await;

    let events = drain(&mut watcher);
    assert_eq!(events.len(), 1);
    match &events[0] {
        ServerEvent::RoomList(list) => {
            assert_eq!(list.len(), 1);
            assert_eq!(list[0].id, RoomId::new("AB12"));
        }
        other => panic!("expected roomList, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_password_scenario() {
    let handle = coordinator();
    let mut c1 = client(&handle, 1).await;
    let mut c2 = client(&handle, 2).await;

    handle
        .submit(
            conn(1),
            ClientEvent::CreateRoom { password: Some("xyz".into()), is_public: true },
        )
        .await
        .unwrap();
    handle
        .submit(
            conn(2),
            ClientEvent::JoinRoom {
                room_id: RoomId::new("AB12"),
                password: Some("abc".into()),
            },
        )
        .await
        .unwrap();

    match next_non_list(&mut c2).await {
        ServerEvent::Error { code, message } => {
            assert_eq!(code, ErrorCode::WrongPassword);
            assert!(message.contains("wrong password"));
        }
        other => panic!("expected error, got {other:?}"),
    }
    let rooms = handle.rooms().await.unwrap();
    assert_eq!(rooms[0].members, vec![conn(1)]);

    // Creator saw only its own roomCreated and broadcasts.
    settle(&handle).await;
    assert!(
        drain(&mut c1)
            .iter()
            .all(|e| matches!(e, ServerEvent::RoomCreated { .. } | ServerEvent::RoomList(_)))
    );
}

#[tokio::test]
async fn test_disconnect_scenario() {
    let handle = coordinator();
    let mut c1 = client(&handle, 1).await;
    let _c2 = client(&handle, 2).await;
    let mut c3 = client(&handle, 3).await;

    handle
        .submit(conn(1), ClientEvent::CreateRoom { password: None, is_public: true })
        .await
        .unwrap();
    handle
        .submit(
            conn(2),
            ClientEvent::JoinRoom { room_id: RoomId::new("AB12"), password: None },
        )
        .await
        .unwrap();
    settle(&handle).await;
    drain(&mut c1);

    handle.disconnect(conn(2)).await.unwrap();
    assert_eq!(next_non_list(&mut c1).await, ServerEvent::OpponentDisconnected);

    settle(&handle).await;
    drain(&mut c3);
    handle.submit(conn(3), ClientEvent::GetRooms).await.unwrap();
    settle(&handle).await;
    assert_eq!(drain(&mut c3), vec![ServerEvent::RoomList(vec![])]);
    assert!(handle.rooms().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_disconnected_client_is_never_addressed() {
    let handle = coordinator();
    let _c1 = client(&handle, 1).await;
    let mut c2 = client(&handle, 2).await;

    handle.disconnect(conn(2)).await.unwrap();
    handle
        .submit(conn(1), ClientEvent::CreateRoom { password: None, is_public: true })
        .await
        .unwrap();
    settle(&handle).await;

    // The coordinator dropped its sender, so the channel is closed and
    // nothing was delivered after the disconnect.
    assert!(matches!(c2.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));
}

#[tokio::test]
async fn test_events_from_unregistered_connections_are_ignored() {
    let handle = coordinator();
    handle
        .submit(conn(42), ClientEvent::CreateRoom { password: None, is_public: true })
        .await
        .unwrap();
    assert!(handle.rooms().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_progress_relay_and_finish() {
    let handle = coordinator();
    let mut c1 = client(&handle, 1).await;
    let mut c2 = client(&handle, 2).await;

    handle
        .submit(conn(1), ClientEvent::CreateRoom { password: None, is_public: true })
        .await
        .unwrap();
    handle
        .submit(
            conn(2),
            ClientEvent::JoinRoom { room_id: RoomId::new("AB12"), password: None },
        )
        .await
        .unwrap();
    handle
        .submit(
            conn(1),
            ClientEvent::StartGame {
                room_id: RoomId::new("AB12"),
                layout: json!([]),
                size: json!(null),
            },
        )
        .await
        .unwrap();
    settle(&handle).await;
    drain(&mut c1);
    drain(&mut c2);

    handle
        .submit(
            conn(1),
            ClientEvent::UpdateStatus {
                room_id: RoomId::new("AB12"),
                time: Number::from(10),
                steps: 4,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        next_non_list(&mut c2).await,
        ServerEvent::OpponentUpdate { time: Number::from(10), steps: 4 }
    );
    settle(&handle).await;
    assert!(drain(&mut c1).is_empty(), "sender gets no echo");

    handle
        .submit(
            conn(2),
            ClientEvent::FinishGame {
                room_id: RoomId::new("AB12"),
                time: Number::from(30),
                steps: 12,
            },
        )
        .await
        .unwrap();
    let ended = ServerEvent::GameEnded {
        winner_id: conn(2),
        winner_time: Number::from(30),
        winner_steps: 12,
    };
    assert_eq!(next_non_list(&mut c1).await, ended);
    assert_eq!(next_non_list(&mut c2).await, ended);
    assert_eq!(handle.rooms().await.unwrap()[0].status, RoomStatus::Finished);
}

#[tokio::test]
async fn test_client_that_never_reads_does_not_grow_or_block() {
    let handle = coordinator();
    let (tx, mut stalled) = mpsc::channel(2);
    handle.connect(conn(9), tx).await.unwrap();
    let mut c1 = client(&handle, 1).await;

    // Each create/leave pair broadcasts twice; far more than the stalled
    // client's queue holds.
    for _ in 0..10 {
        handle
            .submit(conn(1), ClientEvent::CreateRoom { password: None, is_public: true })
            .await
            .unwrap();
        handle
            .submit(conn(1), ClientEvent::LeaveRoom { room_id: None })
            .await
            .unwrap();
    }
    settle(&handle).await;

    assert_eq!(drain(&mut stalled).len(), 2, "overflow is dropped, not queued");
    let events = drain(&mut c1);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ServerEvent::RoomCreated { .. }))
            .count(),
        10,
        "a reading client misses nothing"
    );
}

#[tokio::test]
async fn test_shutdown_closes_the_handle() {
    let handle = coordinator();
    handle.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(handle.is_closed());
    assert!(handle.rooms().await.is_err());
}
