//! Per-connection handler: command decoding, dispatch, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus an outbound pump task. The flow is:
//!   1. Mint a `PlayerId` from the connection id
//!   2. Spawn the pump, the only writer on this socket, draining the
//!      player's event channel
//!   3. Loop: receive frames → decode a `ClientCommand` → dispatch → ack
//!   4. On exit, leave every room the player was still in

use std::sync::Arc;

use tokio::sync::mpsc;

use toohak_game::PlayerAction;
use toohak_protocol::{ClientCommand, Codec, PlayerId, PlayerInfo, RoomId, ServerEvent};
use toohak_room::{JoinKind, PlayerSender};
use toohak_transport::{Connection, WebSocketConnection};

use crate::ToohakError;
use crate::server::ServerState;

/// Drop guard that cleans up a player's room memberships when the
/// handler exits, panics included. `Drop` is synchronous, so the async
/// lock is taken in a fire-and-forget task.
struct DisconnectGuard<C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.registry.lock().await.disconnect(player_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ToohakError>
where
    C: Codec + Clone,
{
    let conn_id = conn.id();
    let player_id = PlayerId(conn_id.into_inner());
    tracing::debug!(%conn_id, %player_id, "handling new connection");

    // All outbound traffic, room events and acks alike, funnels through
    // one channel so the client observes a single consistent order.
    let (outbound, events) = mpsc::unbounded_channel();
    // Detached on purpose: the pump outlives this handler until the
    // registry drops the player's last sender clone during disconnect
    // cleanup, then flushes and closes the socket.
    tokio::spawn(run_outbound_pump(conn.clone(), state.codec.clone(), events));

    let _guard = DisconnectGuard {
        player_id,
        state: Arc::clone(&state),
    };

    loop {
        let text = match conn.recv().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Err(err) => {
                tracing::debug!(%player_id, error = %err, "recv error");
                break;
            }
        };

        let command: ClientCommand = match state.codec.decode(&text) {
            Ok(command) => command,
            Err(err) => {
                tracing::debug!(%player_id, error = %err, "failed to decode command");
                continue;
            }
        };

        dispatch_command(&state, player_id, &outbound, command).await;
    }

    // _guard drops here → room cleanup fires.
    Ok(())
}

/// Forwards queued events to the socket, then closes it. The pump is
/// this connection's only writer; it exits when the player's last
/// channel sender drops or the socket rejects a frame.
async fn run_outbound_pump<C: Codec>(
    conn: WebSocketConnection,
    codec: C,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
) {
    while let Some(event) = events.recv().await {
        let text = match codec.encode(&event) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(id = %conn.id(), error = %err, "failed to encode outbound event");
                continue;
            }
        };
        if let Err(err) = conn.send(&text).await {
            tracing::debug!(id = %conn.id(), error = %err, "outbound send failed");
            break;
        }
    }
    let _ = conn.close().await;
}

/// Routes one decoded command to the registry and queues the ack.
async fn dispatch_command<C: Codec>(
    state: &ServerState<C>,
    player_id: PlayerId,
    outbound: &PlayerSender,
    command: ClientCommand,
) {
    let cmd = command.name();
    match command {
        ClientCommand::JoinRoom {
            room_id,
            display_name,
            max_players,
        } => {
            if room_id.as_str().trim().is_empty() {
                push_ack(outbound, ServerEvent::ack_err(cmd, "Invalid room ID provided."));
                return;
            }
            let display_name = match display_name.trim() {
                "" => format!("Player_{}", player_id.0),
                name => name.to_owned(),
            };
            let player = PlayerInfo {
                id: player_id,
                display_name,
            };

            let result = state
                .registry
                .lock()
                .await
                .join_or_create(room_id.clone(), player, max_players, outbound.clone())
                .await;

            let ack = match result {
                Ok(outcome) => {
                    let message = match outcome.kind {
                        JoinKind::Created => {
                            format!("Room \"{room_id}\" created and joined successfully.")
                        }
                        JoinKind::Joined => format!("Successfully joined room \"{room_id}\"."),
                        JoinKind::Resynced => format!("You are already in room \"{room_id}\"."),
                    };
                    match to_ack_data(&outcome.snapshot) {
                        Some(data) => ServerEvent::ack_ok_with(cmd, message, data),
                        None => ServerEvent::ack_ok(cmd, message),
                    }
                }
                Err(err) => ServerEvent::ack_err(cmd, err.to_string()),
            };
            push_ack(outbound, ack);
        }

        ClientCommand::LeaveRoom { room_id } => {
            let result = state
                .registry
                .lock()
                .await
                .leave(room_id.clone(), player_id)
                .await;
            let ack = match result {
                Ok(()) => ServerEvent::ack_ok(cmd, format!("Successfully left room \"{room_id}\".")),
                Err(err) => ServerEvent::ack_err(cmd, err.to_string()),
            };
            push_ack(outbound, ack);
        }

        ClientCommand::KickPlayer { room_id, target_id } => {
            let result = state
                .registry
                .lock()
                .await
                .kick(room_id.clone(), player_id, target_id)
                .await;
            let ack = match result {
                Ok(()) => {
                    ServerEvent::ack_ok(cmd, format!("Player removed from room \"{room_id}\"."))
                }
                Err(err) => ServerEvent::ack_err(cmd, err.to_string()),
            };
            push_ack(outbound, ack);
        }

        ClientCommand::StartGame {
            room_id,
            game_kind,
            total_questions,
        } => {
            let result = state
                .registry
                .lock()
                .await
                .start_game(room_id.clone(), player_id, game_kind, total_questions)
                .await;
            let ack = match result {
                Ok(view) => ServerEvent::ack_ok_with(
                    cmd,
                    format!("Game started in room \"{room_id}\"."),
                    view,
                ),
                Err(err) => ServerEvent::ack_err(cmd, err.to_string()),
            };
            push_ack(outbound, ack);
        }

        ClientCommand::SubmitAnswer {
            room_id,
            question_ref,
            option_index,
        } => {
            let action = PlayerAction::SubmitAnswer {
                question_ref,
                option_index,
            };
            ack_player_action(state, player_id, outbound, cmd, room_id, action).await;
        }

        ClientCommand::RequestQuestion { room_id } => {
            ack_player_action(
                state,
                player_id,
                outbound,
                cmd,
                room_id,
                PlayerAction::RequestQuestion,
            )
            .await;
        }

        ClientCommand::SendMessage { room_id, text } => {
            let result = state
                .registry
                .lock()
                .await
                .chat(room_id, player_id, text)
                .await;
            let ack = match result {
                Ok(()) => ServerEvent::ack_ok(cmd, "Message sent."),
                Err(err) => ServerEvent::ack_err(cmd, err.to_string()),
            };
            push_ack(outbound, ack);
        }
    }
}

/// Runs an in-game move and acks with the game's verdict.
async fn ack_player_action<C: Codec>(
    state: &ServerState<C>,
    player_id: PlayerId,
    outbound: &PlayerSender,
    cmd: &str,
    room_id: RoomId,
    action: PlayerAction,
) {
    let result = state
        .registry
        .lock()
        .await
        .player_action(room_id, player_id, action)
        .await;
    let ack = match result {
        Ok(outcome) => ServerEvent::Ack {
            cmd: cmd.to_owned(),
            success: outcome.accepted,
            message: outcome.message,
            data: outcome.data,
        },
        Err(err) => ServerEvent::ack_err(cmd, err.to_string()),
    };
    push_ack(outbound, ack);
}

fn push_ack(outbound: &PlayerSender, ack: ServerEvent) {
    if outbound.send(ack).is_err() {
        tracing::debug!("player channel closed before ack delivery");
    }
}

fn to_ack_data<T: serde::Serialize>(value: &T) -> Option<serde_json::Value> {
    match serde_json::to_value(value) {
        Ok(data) => Some(data),
        Err(err) => {
            tracing::warn!(error = %err, "failed to serialize ack payload");
            None
        }
    }
}
