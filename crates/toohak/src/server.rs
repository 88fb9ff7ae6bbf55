//! `ToohakServer` builder and accept loop.
//!
//! This is the entry point for running a quiz server. It ties the layers
//! together: transport → protocol → rooms → games.

use std::sync::Arc;

use tokio::sync::Mutex;

use toohak_game::{GameOptions, QuestionBank};
use toohak_protocol::{Codec, JsonCodec};
use toohak_room::{RoomConfig, RoomRegistry};
use toohak_transport::{Transport, WebSocketTransport};

use crate::ToohakError;
use crate::handler::handle_connection;

/// Shared server state handed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry sits behind a single lock; it is held only for room lookup
/// and membership bookkeeping, since each room serializes its own work
/// on its actor task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Mutex<RoomRegistry>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Toohak server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), toohak::ToohakError> {
/// use toohak::ToohakServer;
///
/// let server = ToohakServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ToohakServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    game_options: GameOptions,
    bank: Option<Arc<QuestionBank>>,
}

impl ToohakServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            room_config: RoomConfig::default(),
            game_options: GameOptions::default(),
            bank: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Overrides the room player limits.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Overrides the default game timings and question counts.
    pub fn game_options(mut self, options: GameOptions) -> Self {
        self.game_options = options;
        self
    }

    /// Replaces the built-in question bank.
    pub fn question_bank(mut self, bank: Arc<QuestionBank>) -> Self {
        self.bank = Some(bank);
        self
    }

    /// Builds the server, binding the WebSocket listener.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`, the stack the quiz web
    /// client speaks.
    pub async fn build(self) -> Result<ToohakServer<JsonCodec>, ToohakError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let bank = self
            .bank
            .unwrap_or_else(|| Arc::new(QuestionBank::builtin()));
        let registry = RoomRegistry::new(self.room_config, self.game_options, bank);

        let state = Arc::new(ServerState {
            registry: Mutex::new(registry),
            codec: JsonCodec,
        });

        Ok(ToohakServer { transport, state })
    }
}

impl Default for ToohakServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Toohak server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ToohakServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl ToohakServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ToohakServerBuilder {
        ToohakServerBuilder::new()
    }
}

impl<C> ToohakServer<C>
where
    C: Codec + Clone,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each
    /// one. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ToohakError> {
        tracing::info!("toohak server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(conn, state).await {
                            tracing::debug!(error = %err, "connection ended with error");
                        }
                    });
                }
                Err(err) => {
                    tracing::error!(error = %err, "accept failed");
                }
            }
        }
    }
}
