//! Core wire types for the Toohak protocol.
//!
//! Everything in this module travels on the wire as JSON text frames:
//! client commands tagged by `cmd`, server events tagged by `event`, and
//! the snapshot and score structures embedded inside them. Field names are
//! camelCase on the wire, matching what the web client parses.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected player.
///
/// Player identity is connection identity: the server assigns one of these
/// per connection, and a join carrying an id that is already seated in the
/// room is treated as a resync of that player, never as a second member.
///
/// `#[serde(transparent)]` keeps the wire form a plain number, so
/// `PlayerId(42)` serializes to `42` rather than `{"0":42}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A room's name, chosen by whichever client creates the room.
///
/// Unlike [`PlayerId`], room ids are externally supplied strings ("abcd",
/// "friday-quiz") rather than server-assigned numbers. The newtype keeps
/// them from being confused with other strings such as display names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        RoomId(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        RoomId(s)
    }
}

// ---------------------------------------------------------------------------
// Game status and kind
// ---------------------------------------------------------------------------

/// The lifecycle state of a room's game session.
///
/// While a room sits in the lobby (`WaitingToStart` or `Ready`), the status
/// is a pure function of the player count against the room minimum. Once a
/// game starts, only the game instance moves the status.
///
/// The wire strings are the spaced lowercase forms the web client matches
/// on: `"waiting to start"`, `"in game"`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    /// Lobby with fewer players than the room minimum.
    #[serde(rename = "waiting to start")]
    WaitingToStart,
    /// Lobby with enough players; the admin may start the game.
    #[serde(rename = "ready")]
    Ready,
    /// A game instance is running.
    #[serde(rename = "in game")]
    InGame,
    /// The game finished; the room keeps the final state around.
    #[serde(rename = "concluded")]
    Concluded,
    /// Reserved for pause support; never derived from player count.
    #[serde(rename = "paused")]
    Paused,
}

impl GameStatus {
    /// Whether new players may still join a room in this status.
    pub fn is_joinable(self) -> bool {
        matches!(self, GameStatus::WaitingToStart | GameStatus::Ready)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameStatus::WaitingToStart => "waiting to start",
            GameStatus::Ready => "ready",
            GameStatus::InGame => "in game",
            GameStatus::Concluded => "concluded",
            GameStatus::Paused => "paused",
        };
        f.write_str(s)
    }
}

/// Which game variant a room runs.
///
/// Selected when the admin starts the game; defaults to [`GameKind::Toohak`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    /// Synchronized rounds with a shared deadline: the whole room answers
    /// the same question at the same time.
    #[default]
    Toohak,
    /// Solo practice inside a shared room: each player works through a
    /// personal question budget at their own pace.
    Trivia,
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameKind::Toohak => f.write_str("toohak"),
            GameKind::Trivia => f.write_str("trivia"),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive an event?
// ---------------------------------------------------------------------------

/// Selects which room members receive an outbound event.
///
/// Lifecycle and game code return `(Recipient, ServerEvent)` pairs and the
/// room actor fans them out. Delivery stays in one place, and the same
/// mechanism serves broadcasts ("everyone sees the question") and directed
/// sends ("only the kicked player learns they were kicked").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every player currently in the room.
    All,
    /// One specific player.
    Player(PlayerId),
    /// Everyone except the specified player.
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// A player's public identity inside a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub display_name: String,
}

/// The room view returned on a successful join (including resyncs).
///
/// Players appear in join order; the first entry is the room's founder
/// unless the admin role has since been handed off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub players: Vec<PlayerInfo>,
    pub admin_id: Option<PlayerId>,
    pub status: GameStatus,
    pub max_players: usize,
}

/// One row of a final-score table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub player_id: PlayerId,
    pub display_name: String,
    pub score: u32,
}

/// One row of the per-round reveal: the running score plus whether the
/// player got an answer in before the round closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRoundView {
    pub player_id: PlayerId,
    pub display_name: String,
    pub score: u32,
    pub answered: bool,
}

// ---------------------------------------------------------------------------
// ClientCommand: inbound frames
// ---------------------------------------------------------------------------

/// A command sent by a client, tagged by `cmd` on the wire.
///
/// Every command is room-scoped. The acting player is never part of the
/// payload: the server attaches the connection's own [`PlayerId`], so a
/// client cannot act on another player's behalf.
///
/// ```json
/// { "cmd": "joinRoom", "roomId": "abcd", "displayName": "Alice" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    /// Join `room_id`, creating the room if it does not exist yet.
    /// `max_players` is honored only at creation time and is clamped
    /// below by the server's configured minimum.
    JoinRoom {
        room_id: RoomId,
        display_name: String,
        #[serde(default)]
        max_players: Option<usize>,
    },
    /// Leave the room. The last player out deletes it.
    LeaveRoom { room_id: RoomId },
    /// Admin only: remove `target_id` from the room.
    KickPlayer { room_id: RoomId, target_id: PlayerId },
    /// Admin only: start a game in a `Ready` room. Defaults to Toohak
    /// with the server's configured question count.
    StartGame {
        room_id: RoomId,
        #[serde(default)]
        game_kind: Option<GameKind>,
        #[serde(default)]
        total_questions: Option<u32>,
    },
    /// Answer the currently open question. `question_ref` must match the
    /// round the server most recently dealt, or the answer is rejected.
    SubmitAnswer {
        room_id: RoomId,
        question_ref: u32,
        option_index: usize,
    },
    /// Trivia only: deal (or re-deal) this player's current question.
    RequestQuestion { room_id: RoomId },
    /// Relay a chat line to the whole room.
    SendMessage { room_id: RoomId, text: String },
}

impl ClientCommand {
    /// The wire-level command name, echoed back in [`ServerEvent::Ack`].
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::JoinRoom { .. } => "joinRoom",
            ClientCommand::LeaveRoom { .. } => "leaveRoom",
            ClientCommand::KickPlayer { .. } => "kickPlayer",
            ClientCommand::StartGame { .. } => "startGame",
            ClientCommand::SubmitAnswer { .. } => "submitAnswer",
            ClientCommand::RequestQuestion { .. } => "requestQuestion",
            ClientCommand::SendMessage { .. } => "sendMessage",
        }
    }

    /// The room this command addresses.
    pub fn room_id(&self) -> &RoomId {
        match self {
            ClientCommand::JoinRoom { room_id, .. }
            | ClientCommand::LeaveRoom { room_id }
            | ClientCommand::KickPlayer { room_id, .. }
            | ClientCommand::StartGame { room_id, .. }
            | ClientCommand::SubmitAnswer { room_id, .. }
            | ClientCommand::RequestQuestion { room_id }
            | ClientCommand::SendMessage { room_id, .. } => room_id,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent: outbound frames
// ---------------------------------------------------------------------------

/// An event pushed by the server, tagged by `event` on the wire.
///
/// Most events are room broadcasts. [`ServerEvent::Kicked`] and the Trivia
/// question/conclusion events are directed at a single player, and
/// [`ServerEvent::Ack`] always goes only to the command's sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A new player was seated in the room.
    PlayerJoined { room_id: RoomId, player: PlayerInfo },
    /// A player left, whether voluntarily, kicked, or disconnected.
    PlayerLeft { room_id: RoomId, player_id: PlayerId },
    /// The admin role moved to another player.
    NewAdmin {
        room_id: RoomId,
        admin_id: PlayerId,
        display_name: String,
    },
    /// The room's lifecycle status changed.
    GameStateChanged { room_id: RoomId, new_state: GameStatus },
    /// A question was dealt. `deadline_ms` is absent for Trivia, which
    /// has no shared round clock.
    NewQuestion {
        question_ref: u32,
        text: String,
        options: Vec<String>,
        deadline_ms: Option<u64>,
    },
    /// Someone answered the open question. Correctness is deliberately
    /// omitted while the round is open.
    PlayerAnswered { player_id: PlayerId, question_ref: u32 },
    /// The round closed: the correct option is revealed along with every
    /// player's running score.
    RoundEnded {
        question_ref: u32,
        correct_option_index: usize,
        scores: Vec<PlayerRoundView>,
    },
    /// The game is over: for the whole room when broadcast, or for one
    /// Trivia player when sent directed.
    GameConcluded {
        reason: String,
        final_scores: Vec<ScoreEntry>,
    },
    /// Directed at a kicked player, distinct from the `playerLeft`
    /// broadcast the rest of the room sees.
    Kicked { room_id: RoomId },
    /// A chat line relayed to the room, sender included.
    ChatMessage {
        room_id: RoomId,
        player_id: PlayerId,
        display_name: String,
        text: String,
    },
    /// The direct answer to a command, echoing the command's name.
    Ack {
        cmd: String,
        success: bool,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
}

impl ServerEvent {
    /// Builds a success ack for the named command.
    pub fn ack_ok(cmd: &str, message: impl Into<String>) -> Self {
        ServerEvent::Ack {
            cmd: cmd.to_owned(),
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// Builds a success ack carrying a `data` payload.
    pub fn ack_ok_with(
        cmd: &str,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        ServerEvent::Ack {
            cmd: cmd.to_owned(),
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Builds a failure ack for the named command.
    pub fn ack_err(cmd: &str, message: impl Into<String>) -> Self {
        ServerEvent::Ack {
            cmd: cmd.to_owned(),
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
