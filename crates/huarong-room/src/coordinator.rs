//! Coordinator actor: one Tokio task that owns the room table.
//!
//! Every inbound event, connect, and disconnect goes through a single
//! mpsc mailbox, so no two events ever interleave their mutations. The
//! actor also keeps the registry of live client channels and delivers
//! each operation's outbox through it. Delivery never awaits: client
//! channels are bounded, and an event for a client whose queue is full or
//! closed is dropped.

use std::collections::HashMap;

use huarong_protocol::{ClientEvent, ConnectionId, Recipient, ServerEvent};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::{Outbox, RoomCodes, RoomConfig, RoomError, RoomInfo, RoomTable};

/// Channel on which a connection handler receives its outbound events.
pub type ClientSender = mpsc::Sender<ServerEvent>;

/// Suggested capacity for a [`ClientSender`]: how far a client may fall
/// behind before its events are dropped.
pub const CLIENT_QUEUE_SIZE: usize = 256;

/// Commands sent to the coordinator through its mailbox.
enum Command {
    /// A connection opened; start addressing it.
    Connect {
        conn_id: ConnectionId,
        sender: ClientSender,
    },

    /// A connection closed; forget it and clean up its room.
    Disconnect { conn_id: ConnectionId },

    /// A validated event from a connection.
    Event {
        from: ConnectionId,
        event: ClientEvent,
    },

    /// Snapshot every room.
    Inspect { reply: oneshot::Sender<Vec<RoomInfo>> },

    Shutdown,
}

/// Handle to the running coordinator.
///
/// Cheap to clone; every connection handler holds one.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Registers a new connection and the channel that reaches it.
    pub async fn connect(
        &self,
        conn_id: ConnectionId,
        sender: ClientSender,
    ) -> Result<(), RoomError> {
        self.send(Command::Connect { conn_id, sender }).await
    }

    /// Reports that a connection closed.
    pub async fn disconnect(
        &self,
        conn_id: ConnectionId,
    ) -> Result<(), RoomError> {
        self.send(Command::Disconnect { conn_id }).await
    }

    /// Submits an event from `from` (fire-and-forget).
    ///
    /// Replies, if any, arrive on the connection's [`ClientSender`].
    pub async fn submit(
        &self,
        from: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), RoomError> {
        self.send(Command::Event { from, event }).await
    }

    /// Returns a snapshot of every room, in creation order.
    pub async fn rooms(&self) -> Result<Vec<RoomInfo>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Inspect { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Stops the coordinator. Queued commands ahead of this one still run.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(Command::Shutdown).await
    }

    /// Returns `true` once the coordinator task has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, cmd: Command) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable)
    }
}

/// The actor state. Runs inside a Tokio task.
struct Coordinator<S: RoomCodes> {
    table: RoomTable<S>,
    clients: HashMap<ConnectionId, ClientSender>,
    receiver: mpsc::Receiver<Command>,
}

impl<S: RoomCodes> Coordinator<S> {
    async fn run(mut self) {
        tracing::info!("room coordinator started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                Command::Connect { conn_id, sender } => {
                    self.clients.insert(conn_id, sender);
                    tracing::debug!(
                        %conn_id,
                        clients = self.clients.len(),
                        "client registered"
                    );
                }
                Command::Disconnect { conn_id } => {
                    // Unregister first so the cleanup below can't address
                    // the dead connection.
                    self.clients.remove(&conn_id);
                    let out = self.table.disconnect(conn_id);
                    self.deliver(out);
                    tracing::debug!(
                        %conn_id,
                        clients = self.clients.len(),
                        "client unregistered"
                    );
                }
                Command::Event { from, event } => {
                    if !self.clients.contains_key(&from) {
                        tracing::debug!(
                            %from,
                            event = event.name(),
                            "event from unregistered connection ignored"
                        );
                        continue;
                    }
                    let out = self.table.apply(from, event);
                    self.deliver(out);
                }
                Command::Inspect { reply } => {
                    let _ = reply.send(self.table.infos());
                }
                Command::Shutdown => {
                    tracing::info!("room coordinator shutting down");
                    break;
                }
            }
        }

        tracing::info!(rooms = self.table.room_count(), "room coordinator stopped");
    }

    fn deliver(&self, out: Outbox) {
        for (recipient, event) in out {
            match recipient {
                Recipient::One(conn_id) => self.send_to(conn_id, event),
                Recipient::Many(ids) => {
                    for conn_id in ids {
                        self.send_to(conn_id, event.clone());
                    }
                }
                Recipient::Everyone => {
                    for (conn_id, sender) in &self.clients {
                        push(*conn_id, sender, event.clone());
                    }
                }
            }
        }
    }

    /// Sends to one client. Silently drops if it is unknown or gone.
    fn send_to(&self, conn_id: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.clients.get(&conn_id) {
            push(conn_id, sender, event);
        }
    }
}

/// Queues without waiting. A full queue loses the event.
fn push(conn_id: ConnectionId, sender: &ClientSender, event: ServerEvent) {
    match sender.try_send(event) {
        Ok(()) | Err(TrySendError::Closed(_)) => {}
        Err(TrySendError::Full(event)) => {
            tracing::warn!(
                %conn_id,
                event = event.name(),
                "client queue full, event dropped"
            );
        }
    }
}

/// Spawns the coordinator task and returns a handle to it.
///
/// `mailbox_size` bounds the command queue; senders wait while it is full.
pub fn spawn_coordinator<S: RoomCodes>(
    config: RoomConfig,
    codes: S,
    mailbox_size: usize,
) -> CoordinatorHandle {
    let (tx, rx) = mpsc::channel(mailbox_size);

    let actor = Coordinator {
        table: RoomTable::with_codes(config, codes),
        clients: HashMap::new(),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    CoordinatorHandle { sender: tx }
}
