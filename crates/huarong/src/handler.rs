//! Per-connection handler: registration, event routing, and outbound
//! delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Queue `connected{id}` and register the client's channel
//!   2. Spawn a writer that drains the channel into the socket
//!   3. Loop: receive frames → decode → submit to the coordinator
//!   4. On exit, the guard reports the disconnect

use std::sync::Arc;

use huarong_protocol::{ClientEvent, Codec, ErrorCode, JsonCodec, ServerEvent};
use huarong_room::{CLIENT_QUEUE_SIZE, CoordinatorHandle};
use huarong_transport::{Connection, ConnectionId, Frame, WebSocketConnection};
use tokio::sync::mpsc;

use crate::HuarongError;
use crate::server::ServerState;

/// Drop guard that reports the disconnect when the handler exits.
///
/// Runs even if the handler returns early or panics. `Drop` is
/// synchronous, so the async send goes to a fire-and-forget task.
struct ConnectionGuard {
    conn_id: ConnectionId,
    coordinator: CoordinatorHandle,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let coordinator = self.coordinator.clone();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                let _ = coordinator.disconnect(conn_id).await;
            });
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), HuarongError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, peer = %conn.peer_addr(), "client connected");

    let (tx, rx) = mpsc::channel(CLIENT_QUEUE_SIZE);
    // Queued before registration, so it is the first frame the client sees.
    let _ = tx.try_send(ServerEvent::Connected { id: conn_id });
    state.coordinator.connect(conn_id, tx.clone()).await?;
    let _guard = ConnectionGuard {
        conn_id,
        coordinator: state.coordinator.clone(),
    };

    tokio::spawn(write_loop(Arc::clone(&conn), rx, state.codec));

    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!(%conn_id, "client disconnected");
                break;
            }
            Err(e) => {
                tracing::info!(%conn_id, error = %e, "client connection lost");
                break;
            }
        };

        match state.codec.decode::<ClientEvent>(frame.as_bytes()) {
            Ok(event) => {
                tracing::debug!(%conn_id, event = event.name(), "event received");
                state.coordinator.submit(conn_id, event).await?;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "rejected malformed frame");
                // Dropped if the client isn't reading its queue anyway.
                let _ = tx.try_send(ServerEvent::error(
                    ErrorCode::BadRequest,
                    e.to_string(),
                ));
            }
        }
    }

    // _guard drops here → disconnect fires; the writer stops once the
    // coordinator drops its sender.
    Ok(())
}

/// Drains a client's outbound channel into its socket.
///
/// Returns when every sender is gone or the socket stops accepting writes.
async fn write_loop(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::Receiver<ServerEvent>,
    codec: JsonCodec,
) {
    let conn_id = conn.id();

    while let Some(event) = rx.recv().await {
        let text = match codec.encode_text(&event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(
                    %conn_id,
                    event = event.name(),
                    error = %e,
                    "failed to encode event"
                );
                continue;
            }
        };
        if let Err(e) = conn.send(Frame::Text(text)).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }

    let _ = conn.close().await;
}
