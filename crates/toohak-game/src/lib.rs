//! Game variants for Toohak.
//!
//! Games are synchronous state machines behind the [`GameInstance`]
//! trait; the room actor in `toohak-room` drives them and executes the
//! [`Effects`] they return. Two variants ship here: the timed,
//! round-based [`ToohakGame`] and the self-paced [`TriviaGame`].
//!
//! # Key types
//!
//! - [`GameInstance`]: the contract a variant implements
//! - [`new_game`]: builds a variant from a [`GameKind`](toohak_protocol::GameKind)
//! - [`Effects`] / [`TimerDirective`]: what the room actor does after a call
//! - [`QuestionBank`]: shared pool the variants draw questions from
//! - [`GameOptions`]: per-room tunables (round length, question counts)

mod error;
mod instance;
mod question;
mod toohak;
mod trivia;

pub use error::GameError;
pub use instance::{
    ActionOutcome, DeparturePolicy, Effects, GameInstance, GameOptions, PlayerAction,
    TimerDirective, new_game,
};
pub use question::{Question, QuestionBank};
pub use toohak::ToohakGame;
pub use trivia::TriviaGame;
