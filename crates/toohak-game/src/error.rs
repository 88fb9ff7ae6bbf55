//! Error types for the game layer.
//!
//! The `#[error]` strings double as the ack messages clients see, so the
//! user-facing variants are full sentences.

/// Errors raised by game instances while validating player actions or
/// building a bank.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The game is not accepting actions in its current state.
    #[error("Game is not currently in progress.")]
    NotRunning,

    /// The action referenced a round other than the open one. Late
    /// answers to an earlier question land here instead of being
    /// silently applied to the current one.
    #[error("Answer for incorrect or outdated question.")]
    StaleRound,

    /// The player already answered the open question.
    #[error("You have already answered this question.")]
    AlreadyAnswered,

    /// The submitted option index does not exist on the question.
    #[error("Answer option {0} is out of range.")]
    InvalidOption(usize),

    /// The acting player is not part of this game.
    #[error("Player not found in this game.")]
    UnknownPlayer,

    /// A Trivia answer arrived while no question was dealt to the player.
    #[error("No question is pending; request a question first.")]
    NoQuestionPending,

    /// The Trivia player has used up their personal question budget.
    #[error("You have answered all your questions.")]
    BudgetExhausted,

    /// The action does not exist in this game variant, for example a
    /// Trivia question request sent to a Toohak game.
    #[error("That action is not available in this game mode.")]
    UnsupportedAction,

    /// `initialize` was called a second time on the same instance.
    #[error("Game was already initialized.")]
    AlreadyInitialized,

    /// A bank was built from an empty question list.
    #[error("question bank needs at least one question")]
    EmptyBank,

    /// A bank entry has fewer than two options or an out-of-range
    /// correct index.
    #[error("question {0} must have at least two options and an in-range correct index")]
    InvalidQuestion(usize),
}
