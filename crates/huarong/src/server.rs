//! `HuarongServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → room coordinator.

use std::future::Future;
use std::sync::Arc;

use huarong_protocol::JsonCodec;
use huarong_room::{CoordinatorHandle, RandomCodes, RoomConfig, spawn_coordinator};
use huarong_transport::{Incoming, Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{HuarongError, ServerConfig};

/// Default capacity of the coordinator's command mailbox.
pub const DEFAULT_MAILBOX_SIZE: usize = 1024;

/// Shared state handed to every connection task.
pub(crate) struct ServerState {
    pub(crate) coordinator: CoordinatorHandle,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,ignore
/// let server = HuarongServer::builder()
///     .bind("127.0.0.1:0")
///     .room_config(RoomConfig { strict_membership: true, ..Default::default() })
///     .build()
///     .await?;
/// ```
pub struct HuarongServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    mailbox_size: usize,
}

impl HuarongServerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::from_config(ServerConfig::default())
    }

    /// Creates a builder from a loaded [`ServerConfig`].
    pub fn from_config(config: ServerConfig) -> Self {
        Self {
            bind_addr: config.bind_addr,
            room_config: config.room,
            mailbox_size: DEFAULT_MAILBOX_SIZE,
        }
    }

    /// Sets the address to listen on.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the room rules.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets the coordinator mailbox capacity.
    pub fn mailbox_size(mut self, size: usize) -> Self {
        self.mailbox_size = size.max(1);
        self
    }

    /// Binds the listener and starts the room coordinator.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn build(self) -> Result<HuarongServer, HuarongError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let coordinator = spawn_coordinator(
            self.room_config,
            RandomCodes,
            self.mailbox_size,
        );

        let state = Arc::new(ServerState {
            coordinator,
            codec: JsonCodec,
        });

        Ok(HuarongServer { transport, state })
    }
}

impl Default for HuarongServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct HuarongServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl HuarongServer {
    /// Creates a new builder.
    pub fn builder() -> HuarongServerBuilder {
        HuarongServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle to the room coordinator.
    pub fn coordinator(&self) -> CoordinatorHandle {
        self.state.coordinator.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), HuarongError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops the
    /// coordinator.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), HuarongError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            addr = ?self.transport.local_addr().ok(),
            "huarong server running"
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(incoming) => {
                        let state = Arc::clone(&self.state);
                        // Upgrade off the accept loop; a stalled handshake
                        // only holds its own task.
                        tokio::spawn(async move {
                            let peer = incoming.peer_addr();
                            let conn = match incoming.upgrade().await {
                                Ok(conn) => conn,
                                Err(e) => {
                                    tracing::debug!(%peer, error = %e, "handshake failed");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }

        // Already gone is fine: nothing left to stop.
        let _ = self.state.coordinator.shutdown().await;
        Ok(())
    }
}
