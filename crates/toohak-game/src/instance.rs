//! The `GameInstance` contract: the seam between a room and whatever game
//! it runs.
//!
//! The room actor owns one `Box<dyn GameInstance>` at a time and calls
//! into it; the instance never does I/O or arms timers itself. Instead,
//! every call returns an [`Effects`] value describing the events to fan
//! out and what to do with the room's single timer slot. That keeps game
//! code synchronous and unit-testable, and keeps real time handling in
//! one place (the actor's `select!` loop).

use std::sync::Arc;
use std::time::Duration;

use toohak_protocol::{GameKind, GameStatus, PlayerId, PlayerInfo, Recipient, ServerEvent};

use crate::{GameError, QuestionBank, ToohakGame, TriviaGame};

// ---------------------------------------------------------------------------
// Actions and outcomes
// ---------------------------------------------------------------------------

/// A player-driven game move, already stripped of its room addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    /// Answer the question identified by `question_ref`.
    SubmitAnswer { question_ref: u32, option_index: usize },
    /// Trivia: deal (or re-deal) the acting player's current question.
    RequestQuestion,
}

/// The direct result of a [`PlayerAction`], answered to the acting player
/// as an ack.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub accepted: bool,
    pub message: String,
    /// Extra payload for the ack, such as Trivia's per-answer feedback.
    pub data: Option<serde_json::Value>,
}

impl ActionOutcome {
    pub fn accepted(message: impl Into<String>) -> Self {
        ActionOutcome {
            accepted: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn accepted_with(message: impl Into<String>, data: serde_json::Value) -> Self {
        ActionOutcome {
            accepted: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ActionOutcome {
            accepted: false,
            message: message.into(),
            data: None,
        }
    }
}

impl From<GameError> for ActionOutcome {
    fn from(err: GameError) -> Self {
        ActionOutcome::rejected(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Effects and timers
// ---------------------------------------------------------------------------

/// What the room actor should do with its single armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDirective {
    /// Leave any armed timer running.
    Keep,
    /// Replace the armed timer. When it fires, the actor calls
    /// [`GameInstance::handle_timer`] with `generation`; the instance
    /// ignores generations that are no longer current.
    Arm { generation: u64, delay: Duration },
    /// Disarm without replacement.
    Cancel,
}

/// Everything a game call wants the room actor to do on its behalf.
#[derive(Debug)]
pub struct Effects {
    /// Events to fan out, in emission order.
    pub events: Vec<(Recipient, ServerEvent)>,
    pub timer: TimerDirective,
}

impl Effects {
    pub fn none() -> Self {
        Effects {
            events: Vec::new(),
            timer: TimerDirective::Keep,
        }
    }

    /// Queues a broadcast to every player in the room.
    pub fn broadcast(&mut self, event: ServerEvent) {
        self.events.push((Recipient::All, event));
    }

    /// Queues an event for a single player.
    pub fn direct(&mut self, player: PlayerId, event: ServerEvent) {
        self.events.push((Recipient::Player(player), event));
    }

    pub fn arm_timer(&mut self, generation: u64, delay: Duration) {
        self.timer = TimerDirective::Arm { generation, delay };
    }

    pub fn cancel_timer(&mut self) {
        self.timer = TimerDirective::Cancel;
    }

    /// Appends another effects value; a non-`Keep` timer directive from
    /// `other` wins over this one's.
    pub fn merge(&mut self, other: Effects) {
        self.events.extend(other.events);
        if other.timer != TimerDirective::Keep {
            self.timer = other.timer;
        }
    }
}

impl Default for Effects {
    fn default() -> Self {
        Effects::none()
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What happens to a player's standing when they leave mid-game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeparturePolicy {
    /// Keep the departed player's score in round reveals and final
    /// standings. They stop counting toward the all-answered early close.
    #[default]
    RetainScore,
    /// Drop the departed player from reveals and standings entirely.
    Forfeit,
}

/// Tunables for a game instance, owned by the room that creates it.
#[derive(Debug, Clone)]
pub struct GameOptions {
    /// Rounds in a Toohak cycle.
    pub total_questions: u32,
    /// How long each Toohak question stays open.
    pub round_time: Duration,
    /// Pause between a round's reveal and the next question.
    pub settle_time: Duration,
    /// Per-player question budget in Trivia.
    pub trivia_questions: u32,
    pub departure_policy: DeparturePolicy,
}

impl Default for GameOptions {
    fn default() -> Self {
        GameOptions {
            total_questions: 5,
            round_time: Duration::from_millis(10_000),
            settle_time: Duration::from_millis(3_000),
            trivia_questions: 5,
            departure_policy: DeparturePolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// The contract
// ---------------------------------------------------------------------------

/// One running game, behind a uniform lifecycle the room actor drives.
///
/// Implementations are plain state machines: no channels, no clocks, no
/// spawning. The actor calls, the instance mutates itself and describes
/// the fallout through [`Effects`].
///
/// Lifecycle: construct, [`initialize`](GameInstance::initialize) exactly
/// once with the seated players, [`start_cycle`](GameInstance::start_cycle)
/// once the admin starts, then any interleaving of actions, timer firings,
/// and departures until the instance reports
/// [`GameStatus::Concluded`].
pub trait GameInstance: Send + 'static {
    fn kind(&self) -> GameKind;

    /// The wire-visible lifecycle state. The room actor mirrors this into
    /// the room's own status after every call.
    fn status(&self) -> GameStatus;

    /// Seats the given players at score zero and records the admins.
    ///
    /// # Errors
    /// [`GameError::AlreadyInitialized`] on a second call.
    fn initialize(
        &mut self,
        players: &[PlayerInfo],
        admins: &[PlayerId],
    ) -> Result<(), GameError>;

    /// Moves from `Ready` into the running state and triggers the first
    /// question. Calling in any other state is a logged no-op, not an
    /// error.
    fn start_cycle(&mut self) -> Effects;

    /// The single entry point for player moves. Validation failures come
    /// back as a rejected [`ActionOutcome`]; they never tear the game
    /// down.
    fn handle_action(&mut self, player: PlayerId, action: PlayerAction)
    -> (ActionOutcome, Effects);

    /// Called by the actor when an armed timer fires. `generation` is the
    /// value from the arming [`TimerDirective::Arm`]; stale generations
    /// are ignored.
    fn handle_timer(&mut self, generation: u64) -> Effects;

    /// A seated player left the room (leave, kick, or disconnect).
    fn player_left(&mut self, player: PlayerId) -> Effects;

    /// Forces the game to `Concluded`, cancelling timers and emitting
    /// final scores. Idempotent; a second call does nothing.
    fn conclude(&mut self, reason: &str) -> Effects;

    /// A client-safe view of the game. Never contains the correct option
    /// index while a question is open.
    fn client_state(&self) -> serde_json::Value;
}

/// Builds the variant for `kind`. Rooms call this when the admin starts a
/// game; nothing outside this function names a concrete variant type.
pub fn new_game(
    kind: GameKind,
    bank: Arc<QuestionBank>,
    options: GameOptions,
) -> Box<dyn GameInstance> {
    match kind {
        GameKind::Toohak => Box::new(ToohakGame::new(bank, options)),
        GameKind::Trivia => Box::new(TriviaGame::new(bank, options)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effects_merge_keeps_event_order() {
        let mut first = Effects::none();
        first.broadcast(ServerEvent::Kicked {
            room_id: "a".into(),
        });
        let mut second = Effects::none();
        second.broadcast(ServerEvent::Kicked {
            room_id: "b".into(),
        });

        first.merge(second);
        assert_eq!(first.events.len(), 2);
        assert!(
            matches!(&first.events[0].1, ServerEvent::Kicked { room_id } if room_id.as_str() == "a")
        );
    }

    #[test]
    fn test_effects_merge_replaces_timer_unless_keep() {
        let mut armed = Effects::none();
        armed.arm_timer(1, Duration::from_millis(10));

        armed.merge(Effects::none());
        assert!(matches!(armed.timer, TimerDirective::Arm { generation: 1, .. }));

        let mut cancel = Effects::none();
        cancel.cancel_timer();
        armed.merge(cancel);
        assert_eq!(armed.timer, TimerDirective::Cancel);
    }

    #[test]
    fn test_factory_builds_requested_kind() {
        let bank = Arc::new(QuestionBank::builtin());
        let game = new_game(GameKind::Toohak, bank.clone(), GameOptions::default());
        assert_eq!(game.kind(), GameKind::Toohak);

        let game = new_game(GameKind::Trivia, bank, GameOptions::default());
        assert_eq!(game.kind(), GameKind::Trivia);
    }
}
