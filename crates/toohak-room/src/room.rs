//! Room actor: an isolated Tokio task that owns one room.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. The actor owns the member list, the admin
//! seat, chat, the current game instance, and the room's single game
//! timer; nothing else touches that state, so no locks are needed.
//!
//! Game calls return [`Effects`] describing events to fan out and what to
//! do with the timer. The actor executes those, then mirrors the game's
//! status into the room status and announces any change.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use toohak_game::{
    ActionOutcome, Effects, GameError, GameInstance, GameOptions, PlayerAction, QuestionBank,
    TimerDirective, new_game,
};
use toohak_protocol::{
    GameKind, GameStatus, PlayerId, PlayerInfo, Recipient, RoomId, RoomSnapshot, ServerEvent,
};

use crate::{RoomConfig, RoomError, derive_lobby_status};

/// Longest chat message the room will broadcast.
const MAX_CHAT_LEN: usize = 500;

/// Channel sender for delivering server events to one player's connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in each variant is the reply channel; the caller
/// sends a command and awaits the response on it.
pub(crate) enum RoomCommand {
    /// Add a player, registering their outbound channel.
    Join {
        player: PlayerInfo,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },

    /// Remove a player. Replies with the post-removal snapshot so the
    /// registry can spot an emptied room.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },

    /// Admin-initiated removal of another player.
    Kick {
        requester: PlayerId,
        target: PlayerId,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },

    /// Create and start a game. Replies with the client-safe game view.
    StartGame {
        requester: PlayerId,
        kind: Option<GameKind>,
        total_questions: Option<u32>,
        reply: oneshot::Sender<Result<serde_json::Value, RoomError>>,
    },

    /// A player's in-game move.
    Action {
        player_id: PlayerId,
        action: PlayerAction,
        reply: oneshot::Sender<Result<ActionOutcome, RoomError>>,
    },

    /// A chat message to validate and broadcast.
    Chat {
        player_id: PlayerId,
        text: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Request the current room snapshot.
    Snapshot { reply: oneshot::Sender<RoomSnapshot> },

    /// Shut down the room.
    Shutdown,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone, it's just an `mpsc::Sender` wrapper. The registry
/// holds one of these per room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable {
            room_id: self.room_id.clone(),
        }
    }

    pub async fn join(
        &self,
        player: PlayerInfo,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                player,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                player_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn kick(
        &self,
        requester: PlayerId,
        target: PlayerId,
    ) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Kick {
                requester,
                target,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn start_game(
        &self,
        requester: PlayerId,
        kind: Option<GameKind>,
        total_questions: Option<u32>,
    ) -> Result<serde_json::Value, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::StartGame {
                requester,
                kind,
                total_questions,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn action(
        &self,
        player_id: PlayerId,
        action: PlayerAction,
    ) -> Result<ActionOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Action {
                player_id,
                action,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn chat(&self, player_id: PlayerId, text: String) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Chat {
                player_id,
                text,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    config: RoomConfig,
    status: GameStatus,
    /// Members in join order; the head inherits the admin seat.
    players: Vec<PlayerInfo>,
    admin_id: Option<PlayerId>,
    /// Per-player outbound channels.
    senders: HashMap<PlayerId, PlayerSender>,
    game: Option<Box<dyn GameInstance>>,
    bank: Arc<QuestionBank>,
    options: GameOptions,
    /// The single armed game timer: generation tag and deadline.
    timer: Option<(u64, Instant)>,
    receiver: mpsc::Receiver<RoomCommand>,
}

/// Resolves when the deadline passes; never resolves without one.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

impl RoomActor {
    /// Runs the actor loop, interleaving commands with timer firings,
    /// until shutdown or until every handle is dropped.
    async fn run(mut self) {
        info!(room_id = %self.room_id, "room actor started");

        loop {
            let deadline = self.timer.map(|(_, at)| at);
            tokio::select! {
                maybe_cmd = self.receiver.recv() => {
                    let Some(cmd) = maybe_cmd else { break };
                    if self.handle_command(cmd) {
                        break;
                    }
                }
                () = wait_until(deadline) => self.handle_timer_fire(),
            }
        }

        info!(room_id = %self.room_id, "room actor stopped");
    }

    /// Returns `true` when the actor should shut down.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player,
                sender,
                reply,
            } => {
                let result = self.handle_join(player, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.handle_leave(player_id);
                let _ = reply.send(result);
            }
            RoomCommand::Kick {
                requester,
                target,
                reply,
            } => {
                let result = self.handle_kick(requester, target);
                let _ = reply.send(result);
            }
            RoomCommand::StartGame {
                requester,
                kind,
                total_questions,
                reply,
            } => {
                let result = self.handle_start(requester, kind, total_questions);
                let _ = reply.send(result);
            }
            RoomCommand::Action {
                player_id,
                action,
                reply,
            } => {
                let result = self.handle_action(player_id, action);
                let _ = reply.send(result);
            }
            RoomCommand::Chat {
                player_id,
                text,
                reply,
            } => {
                let result = self.handle_chat(player_id, text);
                let _ = reply.send(result);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RoomCommand::Shutdown => {
                info!(room_id = %self.room_id, "room shutting down");
                return true;
            }
        }
        false
    }

    fn handle_join(
        &mut self,
        player: PlayerInfo,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, RoomError> {
        // A member joining again is a resync, not a new player. Refresh
        // their outbound channel so a reconnect starts receiving again.
        if self.players.iter().any(|p| p.id == player.id) {
            debug!(room_id = %self.room_id, player = %player.id, "join is a resync");
            self.senders.insert(player.id, sender);
            return Err(RoomError::AlreadyInRoom {
                room_id: self.room_id.clone(),
            });
        }
        if self.players.len() >= self.config.max_players {
            return Err(RoomError::RoomFull {
                room_id: self.room_id.clone(),
                max_players: self.config.max_players,
            });
        }
        if !self.status.is_joinable() {
            return Err(RoomError::GameInProgress {
                room_id: self.room_id.clone(),
                status: self.status,
            });
        }

        if self.players.is_empty() {
            self.admin_id = Some(player.id);
        }
        self.players.push(player.clone());
        self.senders.insert(player.id, sender);
        info!(
            room_id = %self.room_id,
            player = %player.id,
            players = self.players.len(),
            "player joined"
        );

        self.dispatch(vec![(
            Recipient::AllExcept(player.id),
            ServerEvent::PlayerJoined {
                room_id: self.room_id.clone(),
                player,
            },
        )]);
        self.resync_lobby_status();

        Ok(self.snapshot())
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> Result<RoomSnapshot, RoomError> {
        let Some(index) = self.players.iter().position(|p| p.id == player_id) else {
            return Err(RoomError::NotInRoom {
                room_id: self.room_id.clone(),
            });
        };
        let departed = self.players.remove(index);
        self.senders.remove(&player_id);
        info!(
            room_id = %self.room_id,
            player = %player_id,
            display_name = %departed.display_name,
            players = self.players.len(),
            "player left"
        );

        self.dispatch(vec![(
            Recipient::All,
            ServerEvent::PlayerLeft {
                room_id: self.room_id.clone(),
                player_id,
            },
        )]);

        if self.admin_id == Some(player_id) {
            self.admin_id = self.players.first().map(|p| p.id);
            if let Some(admin) = self.players.first() {
                info!(room_id = %self.room_id, admin = %admin.id, "admin handed off");
                let event = ServerEvent::NewAdmin {
                    room_id: self.room_id.clone(),
                    admin_id: admin.id,
                    display_name: admin.display_name.clone(),
                };
                self.dispatch(vec![(Recipient::All, event)]);
            }
        }

        if let Some(game) = self.game.as_mut() {
            if game.status() == GameStatus::InGame {
                let effects = game.player_left(player_id);
                self.apply_effects(effects);
            }
        }
        self.resync_lobby_status();

        Ok(self.snapshot())
    }

    fn handle_kick(
        &mut self,
        requester: PlayerId,
        target: PlayerId,
    ) -> Result<RoomSnapshot, RoomError> {
        if self.admin_id != Some(requester) {
            return Err(RoomError::NotAdmin {
                action: "kick players",
            });
        }
        if !self.players.iter().any(|p| p.id == target) {
            return Err(RoomError::TargetNotInRoom {
                room_id: self.room_id.clone(),
                target,
            });
        }

        // Deliver the direct notice while the target's channel is still
        // registered, then run the ordinary leave flow for them.
        self.send_to(
            target,
            ServerEvent::Kicked {
                room_id: self.room_id.clone(),
            },
        );
        info!(room_id = %self.room_id, %requester, %target, "player kicked");
        self.handle_leave(target)
    }

    fn handle_start(
        &mut self,
        requester: PlayerId,
        kind: Option<GameKind>,
        total_questions: Option<u32>,
    ) -> Result<serde_json::Value, RoomError> {
        if self.admin_id != Some(requester) {
            return Err(RoomError::NotAdmin {
                action: "start the game",
            });
        }
        if self.status != GameStatus::Ready {
            return Err(RoomError::NotReady {
                status: self.status,
            });
        }

        let kind = kind.unwrap_or_default();
        let mut options = self.options.clone();
        if let Some(total) = total_questions {
            let total = total.max(1);
            match kind {
                GameKind::Toohak => options.total_questions = total,
                GameKind::Trivia => options.trivia_questions = total,
            }
        }

        let mut game = new_game(kind, Arc::clone(&self.bank), options);
        let admins: Vec<PlayerId> = self.admin_id.into_iter().collect();
        if let Err(err) = game.initialize(&self.players, &admins) {
            warn!(room_id = %self.room_id, %err, "game refused to initialize");
            return Err(RoomError::StartFailed);
        }

        let effects = game.start_cycle();
        let view = game.client_state();
        self.game = Some(game);
        info!(
            room_id = %self.room_id,
            %kind,
            players = self.players.len(),
            "game started"
        );

        // Announce the lifecycle change before the first question lands.
        self.sync_game_status();
        self.apply_effects(effects);

        Ok(view)
    }

    fn handle_action(
        &mut self,
        player_id: PlayerId,
        action: PlayerAction,
    ) -> Result<ActionOutcome, RoomError> {
        if !self.players.iter().any(|p| p.id == player_id) {
            return Err(RoomError::NotInRoom {
                room_id: self.room_id.clone(),
            });
        }
        let Some(game) = self.game.as_mut() else {
            return Ok(GameError::NotRunning.into());
        };

        let (outcome, effects) = game.handle_action(player_id, action);
        self.apply_effects(effects);
        Ok(outcome)
    }

    fn handle_chat(&mut self, player_id: PlayerId, text: String) -> Result<(), RoomError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(RoomError::EmptyMessage);
        }
        if text.len() > MAX_CHAT_LEN {
            return Err(RoomError::MessageTooLong { limit: MAX_CHAT_LEN });
        }
        if self.status == GameStatus::Concluded {
            return Err(RoomError::ChatDisabled);
        }
        let Some(player) = self.players.iter().find(|p| p.id == player_id) else {
            return Err(RoomError::ChatUnavailable {
                room_id: self.room_id.clone(),
            });
        };

        let event = ServerEvent::ChatMessage {
            room_id: self.room_id.clone(),
            player_id,
            display_name: player.display_name.clone(),
            text: trimmed.to_owned(),
        };
        debug!(room_id = %self.room_id, player = %player_id, "chat message");
        self.dispatch(vec![(Recipient::All, event)]);
        Ok(())
    }

    fn handle_timer_fire(&mut self) {
        let Some((generation, _)) = self.timer.take() else {
            return;
        };
        let Some(game) = self.game.as_mut() else {
            return;
        };
        debug!(room_id = %self.room_id, generation, "game timer fired");
        let effects = game.handle_timer(generation);
        self.apply_effects(effects);
    }

    /// Fans out a game call's events, applies its timer directive, and
    /// mirrors the game's status into the room.
    fn apply_effects(&mut self, effects: Effects) {
        self.dispatch(effects.events);
        match effects.timer {
            TimerDirective::Keep => {}
            TimerDirective::Arm { generation, delay } => {
                self.timer = Some((generation, Instant::now() + delay));
            }
            TimerDirective::Cancel => self.timer = None,
        }
        self.sync_game_status();
    }

    /// Mirrors the game instance's status into the room status, so the
    /// room never reports a stale lifecycle after timer-driven changes.
    fn sync_game_status(&mut self) {
        if let Some(status) = self.game.as_ref().map(|g| g.status()) {
            self.set_status(status);
        }
    }

    /// Re-derives the lobby status from the player count. Statuses past
    /// the lobby belong to the game instance and are left alone.
    fn resync_lobby_status(&mut self) {
        if !matches!(
            self.status,
            GameStatus::WaitingToStart | GameStatus::Ready
        ) {
            return;
        }
        let derived = derive_lobby_status(self.players.len(), self.config.min_players);
        self.set_status(derived);
    }

    fn set_status(&mut self, next: GameStatus) {
        if next == self.status {
            return;
        }
        self.status = next;
        debug!(room_id = %self.room_id, status = %next, "room status changed");
        self.dispatch(vec![(
            Recipient::All,
            ServerEvent::GameStateChanged {
                room_id: self.room_id.clone(),
                new_state: next,
            },
        )]);
    }

    /// Delivers events to the correct recipients.
    fn dispatch(&self, events: Vec<(Recipient, ServerEvent)>) {
        for (recipient, event) in events {
            match recipient {
                Recipient::All => {
                    for player in &self.players {
                        self.send_to(player.id, event.clone());
                    }
                }
                Recipient::Player(id) => self.send_to(id, event),
                Recipient::AllExcept(excluded) => {
                    for player in &self.players {
                        if player.id != excluded {
                            self.send_to(player.id, event.clone());
                        }
                    }
                }
            }
        }
    }

    /// Sends one event to one player. Silently drops it if the receiver
    /// is gone (player disconnected).
    fn send_to(&self, player_id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            players: self.players.clone(),
            admin_id: self.admin_id,
            status: self.status,
            max_players: self.config.max_players,
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// `channel_size` bounds the command channel; if it fills up, senders
/// wait.
pub(crate) fn spawn_room(
    room_id: RoomId,
    config: RoomConfig,
    bank: Arc<QuestionBank>,
    options: GameOptions,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        room_id: room_id.clone(),
        config,
        status: GameStatus::WaitingToStart,
        players: Vec::new(),
        admin_id: None,
        senders: HashMap::new(),
        game: None,
        bank,
        options,
        timer: None,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
