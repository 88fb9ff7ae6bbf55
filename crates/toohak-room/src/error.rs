//! Error types for the room layer.
//!
//! Display strings double as the user-facing ack messages, so they are
//! full sentences addressed to the acting player.

use toohak_protocol::{ErrorCategory, GameStatus, PlayerId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("Room \"{room_id}\" not found.")]
    NotFound { room_id: RoomId },

    /// The acting player is not a member (or the room is gone).
    #[error("You are not in room \"{room_id}\" or room does not exist.")]
    NotInRoom { room_id: RoomId },

    /// A kick named a player who is not a member.
    #[error("Player \"{target}\" is not in room \"{room_id}\".")]
    TargetNotInRoom { room_id: RoomId, target: PlayerId },

    /// The player is already a member. Joins treat this as a resync and
    /// answer with the current room state.
    #[error("You are already in room \"{room_id}\".")]
    AlreadyInRoom { room_id: RoomId },

    /// No free player slot.
    #[error("Room \"{room_id}\" is full ({max_players} players max).")]
    RoomFull { room_id: RoomId, max_players: usize },

    /// The room's game has started or finished, so joining is closed.
    #[error("Cannot join room \"{room_id}\", game is {status}.")]
    GameInProgress { room_id: RoomId, status: GameStatus },

    /// An admin-only operation from a non-admin. `action` names the
    /// denied operation, e.g. "start the game".
    #[error("Only the room admin can {action}.")]
    NotAdmin { action: &'static str },

    /// Start requested outside the ready state.
    #[error("Game cannot be started. State is \"{status}\" (must be \"ready\").")]
    NotReady { status: GameStatus },

    /// The game instance refused to come up.
    #[error("Failed to update game state on server.")]
    StartFailed,

    /// Chat rejected a whitespace-only message.
    #[error("Cannot send an empty message.")]
    EmptyMessage,

    /// Chat rejected an oversized message.
    #[error("Message is too long (max {limit} characters).")]
    MessageTooLong { limit: usize },

    /// Chat is closed once the game has concluded.
    #[error("Chat is disabled as the game has concluded.")]
    ChatDisabled,

    /// Chat from a non-member, or into a missing room.
    #[error("Cannot send message in room {room_id}.")]
    ChatUnavailable { room_id: RoomId },

    /// The room's command channel is closed or overflowing.
    #[error("Room \"{room_id}\" is unavailable.")]
    Unavailable { room_id: RoomId },
}

impl RoomError {
    /// Coarse classification, used by the shell to shape acks. Notably,
    /// [`ErrorCategory::AlreadySatisfied`] turns a rejected join into a
    /// successful resync.
    pub fn category(&self) -> ErrorCategory {
        match self {
            RoomError::NotFound { .. }
            | RoomError::NotInRoom { .. }
            | RoomError::TargetNotInRoom { .. }
            | RoomError::ChatUnavailable { .. } => ErrorCategory::NotFound,
            RoomError::AlreadyInRoom { .. } => ErrorCategory::AlreadySatisfied,
            RoomError::RoomFull { .. }
            | RoomError::GameInProgress { .. }
            | RoomError::NotAdmin { .. }
            | RoomError::NotReady { .. }
            | RoomError::StartFailed
            | RoomError::EmptyMessage
            | RoomError::MessageTooLong { .. }
            | RoomError::ChatDisabled
            | RoomError::Unavailable { .. } => ErrorCategory::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(s: &str) -> RoomId {
        RoomId::from(s)
    }

    #[test]
    fn test_messages_are_full_sentences() {
        assert_eq!(
            RoomError::NotInRoom { room_id: rid("quiz") }.to_string(),
            "You are not in room \"quiz\" or room does not exist."
        );
        assert_eq!(
            RoomError::RoomFull { room_id: rid("quiz"), max_players: 4 }.to_string(),
            "Room \"quiz\" is full (4 players max)."
        );
        assert_eq!(
            RoomError::GameInProgress { room_id: rid("quiz"), status: GameStatus::InGame }
                .to_string(),
            "Cannot join room \"quiz\", game is in game."
        );
        assert_eq!(
            RoomError::AlreadyInRoom { room_id: rid("quiz") }.to_string(),
            "You are already in room \"quiz\"."
        );
        assert_eq!(
            RoomError::NotAdmin { action: "start the game" }.to_string(),
            "Only the room admin can start the game."
        );
        assert_eq!(
            RoomError::NotReady { status: GameStatus::WaitingToStart }.to_string(),
            "Game cannot be started. State is \"waiting to start\" (must be \"ready\")."
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            RoomError::NotFound { room_id: rid("x") }.category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            RoomError::AlreadyInRoom { room_id: rid("x") }.category(),
            ErrorCategory::AlreadySatisfied
        );
        assert_eq!(
            RoomError::RoomFull { room_id: rid("x"), max_players: 4 }.category(),
            ErrorCategory::Rejected
        );
        assert_eq!(RoomError::ChatDisabled.category(), ErrorCategory::Rejected);
    }
}
