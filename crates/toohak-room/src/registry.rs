//! The room registry: every live room, and who is in which.
//!
//! The registry spawns room actors on demand, routes commands to them by
//! room id, and maintains the reverse index from player to rooms that
//! disconnect clean-up walks. It is the single entry point for room
//! operations from the connection layer.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tracing::{debug, info, warn};

use toohak_game::{ActionOutcome, GameOptions, PlayerAction, QuestionBank};
use toohak_protocol::{ErrorCategory, GameKind, PlayerId, PlayerInfo, RoomId, RoomSnapshot};

use crate::room::spawn_room;
use crate::{PlayerSender, RoomConfig, RoomError, RoomHandle};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// How a join request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// The room did not exist; it was created with the joiner as admin.
    Created,
    /// The player was added to an existing room.
    Joined,
    /// The player was already a member; current state was re-sent.
    Resynced,
}

/// A successful join, carrying the room state for the caller's ack.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub kind: JoinKind,
    pub snapshot: RoomSnapshot,
}

/// Tracks all active rooms and routes operations to their actors.
pub struct RoomRegistry {
    /// Active rooms, keyed by room id.
    rooms: HashMap<RoomId, RoomHandle>,

    /// Rooms each player is currently in, in join order. A player may be
    /// in several rooms at once; disconnect walks this list.
    memberships: HashMap<PlayerId, Vec<RoomId>>,

    config: RoomConfig,
    options: GameOptions,
    bank: Arc<QuestionBank>,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig, options: GameOptions, bank: Arc<QuestionBank>) -> Self {
        Self {
            rooms: HashMap::new(),
            memberships: HashMap::new(),
            config,
            options,
            bank,
        }
    }

    /// Registers a room handle. First writer wins: a second handle for an
    /// id already present is dropped with a warning and the original is
    /// kept.
    pub fn add(&mut self, handle: RoomHandle) -> bool {
        match self.rooms.entry(handle.room_id().clone()) {
            Entry::Occupied(entry) => {
                warn!(room_id = %entry.key(), "room already registered, keeping the original");
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(handle);
                true
            }
        }
    }

    pub fn get(&self, room_id: &RoomId) -> Option<&RoomHandle> {
        self.rooms.get(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }

    /// Ids of the rooms the player is currently a member of.
    pub fn rooms_of(&self, player_id: PlayerId) -> Vec<RoomId> {
        self.memberships
            .get(&player_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Joins a room, creating it first when the id is unknown. The
    /// creator of a fresh room becomes its admin.
    ///
    /// A join by an existing member is answered as a resync: the current
    /// room state comes back as a success instead of an error.
    /// `max_players` is honored only on creation.
    pub async fn join_or_create(
        &mut self,
        room_id: RoomId,
        player: PlayerInfo,
        max_players: Option<usize>,
        sender: PlayerSender,
    ) -> Result<JoinOutcome, RoomError> {
        let player_id = player.id;

        let Some(handle) = self.rooms.get(&room_id).cloned() else {
            let config = self.config.clone().with_max_players_hint(max_players);
            let handle = spawn_room(
                room_id.clone(),
                config,
                Arc::clone(&self.bank),
                self.options.clone(),
                DEFAULT_CHANNEL_SIZE,
            );
            let snapshot = handle.join(player, sender).await?;
            self.add(handle);
            self.track_membership(player_id, room_id.clone());
            info!(room_id = %room_id, admin = %player_id, "room created");
            return Ok(JoinOutcome {
                kind: JoinKind::Created,
                snapshot,
            });
        };

        match handle.join(player, sender).await {
            Ok(snapshot) => {
                self.track_membership(player_id, room_id);
                Ok(JoinOutcome {
                    kind: JoinKind::Joined,
                    snapshot,
                })
            }
            Err(err) if err.category() == ErrorCategory::AlreadySatisfied => {
                let snapshot = handle.snapshot().await?;
                self.track_membership(player_id, room_id);
                Ok(JoinOutcome {
                    kind: JoinKind::Resynced,
                    snapshot,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Removes a player from a room, destroying the room if it empties.
    pub async fn leave(&mut self, room_id: RoomId, player_id: PlayerId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .get(&room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotInRoom {
                room_id: room_id.clone(),
            })?;

        let snapshot = handle.leave(player_id).await?;
        self.untrack_membership(player_id, &room_id);
        if snapshot.players.is_empty() {
            self.destroy(&room_id).await;
        }
        Ok(())
    }

    /// Admin-initiated removal. The target receives a direct kicked
    /// notice before the ordinary leave flow runs for them.
    pub async fn kick(
        &mut self,
        room_id: RoomId,
        requester: PlayerId,
        target: PlayerId,
    ) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .get(&room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotInRoom {
                room_id: room_id.clone(),
            })?;

        let snapshot = handle.kick(requester, target).await?;
        self.untrack_membership(target, &room_id);
        if snapshot.players.is_empty() {
            self.destroy(&room_id).await;
        }
        Ok(())
    }

    /// Runs the leave flow for every room the player is in. Failures are
    /// logged and skipped so one bad room cannot block the rest of the
    /// clean-up.
    pub async fn disconnect(&mut self, player_id: PlayerId) {
        let rooms = self.rooms_of(player_id);
        if rooms.is_empty() {
            debug!(player = %player_id, "disconnected player was not in any room");
            return;
        }
        info!(player = %player_id, rooms = rooms.len(), "cleaning up after disconnect");
        for room_id in rooms {
            if let Err(err) = self.leave(room_id.clone(), player_id).await {
                warn!(
                    room_id = %room_id,
                    player = %player_id,
                    %err,
                    "disconnect clean-up failed"
                );
            }
        }
    }

    /// Starts a game in a room. Replies with the client-safe game view
    /// for the requester's ack.
    pub async fn start_game(
        &self,
        room_id: RoomId,
        requester: PlayerId,
        kind: Option<GameKind>,
        total_questions: Option<u32>,
    ) -> Result<serde_json::Value, RoomError> {
        let handle = self
            .rooms
            .get(&room_id)
            .ok_or_else(|| RoomError::NotFound {
                room_id: room_id.clone(),
            })?;
        handle.start_game(requester, kind, total_questions).await
    }

    /// Routes an in-game move to the player's room.
    pub async fn player_action(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        action: PlayerAction,
    ) -> Result<ActionOutcome, RoomError> {
        let handle = self
            .rooms
            .get(&room_id)
            .ok_or_else(|| RoomError::NotInRoom {
                room_id: room_id.clone(),
            })?;
        handle.action(player_id, action).await
    }

    /// Routes a chat message to a room.
    pub async fn chat(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        text: String,
    ) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .get(&room_id)
            .ok_or_else(|| RoomError::ChatUnavailable {
                room_id: room_id.clone(),
            })?;
        handle.chat(player_id, text).await
    }

    pub async fn snapshot(&self, room_id: &RoomId) -> Result<RoomSnapshot, RoomError> {
        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound {
                room_id: room_id.clone(),
            })?;
        handle.snapshot().await
    }

    /// Snapshots every live room. Rooms that fail to answer (shutting
    /// down) are skipped.
    pub async fn list(&self) -> Vec<RoomSnapshot> {
        let mut snapshots = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok(snapshot) = handle.snapshot().await {
                snapshots.push(snapshot);
            }
        }
        snapshots
    }

    /// Snapshots of every room the player is a member of.
    pub async fn find_by_player(&self, player_id: PlayerId) -> Vec<RoomSnapshot> {
        let mut snapshots = Vec::new();
        for room_id in self.rooms_of(player_id) {
            if let Some(handle) = self.rooms.get(&room_id) {
                if let Ok(snapshot) = handle.snapshot().await {
                    snapshots.push(snapshot);
                }
            }
        }
        snapshots
    }

    /// Shuts a room down and forgets it, clearing the membership index.
    pub async fn destroy(&mut self, room_id: &RoomId) {
        let Some(handle) = self.rooms.remove(room_id) else {
            return;
        };
        let _ = handle.shutdown().await;
        for rooms in self.memberships.values_mut() {
            rooms.retain(|r| r != room_id);
        }
        self.memberships.retain(|_, rooms| !rooms.is_empty());
        info!(room_id = %room_id, "room destroyed");
    }

    fn track_membership(&mut self, player_id: PlayerId, room_id: RoomId) {
        let rooms = self.memberships.entry(player_id).or_default();
        if !rooms.contains(&room_id) {
            rooms.push(room_id);
        }
    }

    fn untrack_membership(&mut self, player_id: PlayerId, room_id: &RoomId) {
        if let Some(rooms) = self.memberships.get_mut(&player_id) {
            rooms.retain(|r| r != room_id);
            if rooms.is_empty() {
                self.memberships.remove(&player_id);
            }
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(
            RoomConfig::default(),
            GameOptions::default(),
            Arc::new(QuestionBank::builtin()),
        )
    }
}
