//! Room configuration and lobby status derivation.

use serde::{Deserialize, Serialize};

use toohak_protocol::GameStatus;

/// Player limits for a room.
///
/// `max_players` can be raised per room through the join command's hint;
/// `min_players` is fixed and doubles as the threshold for the lobby to
/// report itself ready.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Players required before the lobby reports `Ready`.
    pub min_players: usize,
    /// Hard cap on room membership.
    pub max_players: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 4,
        }
    }
}

impl RoomConfig {
    /// Applies a creator's max-players hint. The cap never drops below
    /// `min_players`; a smaller hint is raised to it.
    pub fn with_max_players_hint(mut self, hint: Option<usize>) -> Self {
        if let Some(hint) = hint {
            self.max_players = self.min_players.max(hint);
        }
        self
    }
}

/// The lobby status for a player count: [`GameStatus::Ready`] once enough
/// players are present, [`GameStatus::WaitingToStart`] below that.
///
/// Only meaningful while the room is in the lobby; a started or concluded
/// game owns the status instead.
pub fn derive_lobby_status(player_count: usize, min_players: usize) -> GameStatus {
    if player_count >= min_players {
        GameStatus::Ready
    } else {
        GameStatus::WaitingToStart
    }
}
