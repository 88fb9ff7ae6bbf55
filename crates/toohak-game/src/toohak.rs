//! The Toohak variant: synchronized, timed rounds for the whole room.
//!
//! One question is open at a time. Everyone answers against a shared
//! deadline, the round settles with a reveal, and after a short pause the
//! next question goes out. The cycle ends when the configured number of
//! rounds has been played.
//!
//! State machine:
//!
//! ```text
//! New -> Ready -> (QuestionOpen -> Settling) x N -> Concluded
//! ```
//!
//! `QuestionOpen -> Settling` happens on the round deadline, or early as
//! soon as every seated player has answered. `Settling -> QuestionOpen`
//! happens on the settle timer. Both timers share the room's single timer
//! slot and are distinguished by generation, so a deadline firing late
//! for an already-settled round is ignored instead of double-advancing.

use std::sync::Arc;

use tracing::{debug, warn};

use toohak_protocol::{
    GameKind, GameStatus, PlayerId, PlayerInfo, PlayerRoundView, ScoreEntry, ServerEvent,
};

use crate::{
    ActionOutcome, DeparturePolicy, Effects, GameError, GameInstance, GameOptions,
    PlayerAction, Question, QuestionBank,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToohakState {
    /// Constructed but not yet seated with players.
    New,
    /// Initialized; waiting for the admin to start the cycle.
    Ready,
    /// A question is open and accepting answers.
    QuestionOpen,
    /// The reveal is out; the next question is pending on the settle
    /// timer.
    Settling,
    Concluded,
}

#[derive(Debug)]
struct Seat {
    id: PlayerId,
    display_name: String,
    score: u32,
    answered: bool,
    /// False once the player leaves the room mid-game.
    seated: bool,
}

/// A running Toohak game. Owned and driven by a room actor through the
/// [`GameInstance`] trait.
pub struct ToohakGame {
    bank: Arc<QuestionBank>,
    options: GameOptions,
    state: ToohakState,
    /// Join order, which is also standings order.
    seats: Vec<Seat>,
    admins: Vec<PlayerId>,
    /// Ordinal of the open (or next) round; the wire's `question_ref`.
    round: u32,
    /// Bank index of the current question. Kept for the reveal and for
    /// the no-immediate-repeat exclusion on the next draw.
    bank_index: Option<usize>,
    timer_generation: u64,
}

impl ToohakGame {
    pub fn new(bank: Arc<QuestionBank>, options: GameOptions) -> Self {
        ToohakGame {
            bank,
            options,
            state: ToohakState::New,
            seats: Vec::new(),
            admins: Vec::new(),
            round: 0,
            bank_index: None,
            timer_generation: 0,
        }
    }

    fn seat_mut(&mut self, player: PlayerId) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|seat| seat.id == player)
    }

    fn current_question(&self) -> Option<&Question> {
        self.bank_index.and_then(|index| self.bank.get(index))
    }

    fn next_generation(&mut self) -> u64 {
        self.timer_generation += 1;
        self.timer_generation
    }

    /// True when every seated player has answered the open question.
    /// Empty seating never completes a round.
    fn all_seated_answered(&self) -> bool {
        let mut any = false;
        for seat in self.seats.iter().filter(|seat| seat.seated) {
            if !seat.answered {
                return false;
            }
            any = true;
        }
        any
    }

    fn in_standings(&self, seat: &Seat) -> bool {
        match self.options.departure_policy {
            DeparturePolicy::RetainScore => true,
            DeparturePolicy::Forfeit => seat.seated,
        }
    }

    fn round_views(&self) -> Vec<PlayerRoundView> {
        self.seats
            .iter()
            .filter(|seat| self.in_standings(seat))
            .map(|seat| PlayerRoundView {
                player_id: seat.id,
                display_name: seat.display_name.clone(),
                score: seat.score,
                answered: seat.answered,
            })
            .collect()
    }

    fn final_scores(&self) -> Vec<ScoreEntry> {
        self.seats
            .iter()
            .filter(|seat| self.in_standings(seat))
            .map(|seat| ScoreEntry {
                player_id: seat.id,
                display_name: seat.display_name.clone(),
                score: seat.score,
            })
            .collect()
    }

    /// Draws the next question (never the previous one), broadcasts it,
    /// and arms the round deadline.
    fn open_round(&mut self, effects: &mut Effects) {
        let (index, question) = self.bank.draw(self.bank_index);
        let text = question.text.clone();
        let options = question.options.clone();
        self.bank_index = Some(index);
        self.state = ToohakState::QuestionOpen;

        effects.broadcast(ServerEvent::NewQuestion {
            question_ref: self.round,
            text,
            options,
            deadline_ms: Some(self.options.round_time.as_millis() as u64),
        });
        let generation = self.next_generation();
        effects.arm_timer(generation, self.options.round_time);
        debug!(round = self.round, bank_index = index, "question opened");
    }

    /// Closes the open round: reveal, flag reset, and either the settle
    /// timer toward the next question or conclusion of the cycle.
    fn settle_round(&mut self, effects: &mut Effects) {
        let Some(correct_option_index) =
            self.current_question().map(|q| q.correct_option_index)
        else {
            warn!(round = self.round, "round settled without an open question");
            return;
        };
        self.state = ToohakState::Settling;

        effects.broadcast(ServerEvent::RoundEnded {
            question_ref: self.round,
            correct_option_index,
            scores: self.round_views(),
        });
        for seat in &mut self.seats {
            seat.answered = false;
        }
        self.round += 1;

        if self.round >= self.options.total_questions {
            self.conclude_with(effects, "All questions answered.");
        } else {
            let generation = self.next_generation();
            effects.arm_timer(generation, self.options.settle_time);
        }
    }

    fn conclude_with(&mut self, effects: &mut Effects, reason: &str) {
        self.state = ToohakState::Concluded;
        effects.cancel_timer();
        effects.broadcast(ServerEvent::GameConcluded {
            reason: reason.to_owned(),
            final_scores: self.final_scores(),
        });
        debug!(reason, "toohak game concluded");
    }

    /// Runs the submit-answer validation chain. On success, returns
    /// whether the submitted option is the correct one.
    fn validate_submit(
        &self,
        player: PlayerId,
        question_ref: u32,
        option_index: usize,
    ) -> Result<bool, GameError> {
        if self.state != ToohakState::QuestionOpen {
            return Err(GameError::NotRunning);
        }
        if question_ref != self.round {
            return Err(GameError::StaleRound);
        }
        let seat = self
            .seats
            .iter()
            .find(|seat| seat.id == player && seat.seated)
            .ok_or(GameError::UnknownPlayer)?;
        if seat.answered {
            return Err(GameError::AlreadyAnswered);
        }
        let question = self.current_question().ok_or(GameError::NotRunning)?;
        if option_index >= question.options.len() {
            return Err(GameError::InvalidOption(option_index));
        }
        Ok(option_index == question.correct_option_index)
    }
}

impl GameInstance for ToohakGame {
    fn kind(&self) -> GameKind {
        GameKind::Toohak
    }

    fn status(&self) -> GameStatus {
        match self.state {
            ToohakState::New => GameStatus::WaitingToStart,
            ToohakState::Ready => GameStatus::Ready,
            ToohakState::QuestionOpen | ToohakState::Settling => GameStatus::InGame,
            ToohakState::Concluded => GameStatus::Concluded,
        }
    }

    fn initialize(
        &mut self,
        players: &[PlayerInfo],
        admins: &[PlayerId],
    ) -> Result<(), GameError> {
        if self.state != ToohakState::New {
            return Err(GameError::AlreadyInitialized);
        }
        self.seats = players
            .iter()
            .map(|player| Seat {
                id: player.id,
                display_name: player.display_name.clone(),
                score: 0,
                answered: false,
                seated: true,
            })
            .collect();
        self.admins = admins.to_vec();
        self.state = ToohakState::Ready;
        debug!(players = self.seats.len(), "toohak game initialized");
        Ok(())
    }

    fn start_cycle(&mut self) -> Effects {
        let mut effects = Effects::none();
        if self.state != ToohakState::Ready {
            warn!(status = %self.status(), "start_cycle called outside the ready state");
            return effects;
        }
        self.round = 0;
        for seat in &mut self.seats {
            seat.score = 0;
            seat.answered = false;
        }
        self.open_round(&mut effects);
        effects
    }

    fn handle_action(
        &mut self,
        player: PlayerId,
        action: PlayerAction,
    ) -> (ActionOutcome, Effects) {
        let mut effects = Effects::none();
        match action {
            PlayerAction::SubmitAnswer {
                question_ref,
                option_index,
            } => {
                let correct = match self.validate_submit(player, question_ref, option_index) {
                    Ok(correct) => correct,
                    Err(err) => return (err.into(), effects),
                };
                let Some(seat) = self.seat_mut(player) else {
                    return (GameError::UnknownPlayer.into(), effects);
                };
                if correct {
                    seat.score += 1;
                }
                seat.answered = true;
                debug!(player = %player, correct, round = question_ref, "answer recorded");

                effects.broadcast(ServerEvent::PlayerAnswered {
                    player_id: player,
                    question_ref,
                });
                if self.all_seated_answered() {
                    self.settle_round(&mut effects);
                }
                (ActionOutcome::accepted("Answer submitted."), effects)
            }
            PlayerAction::RequestQuestion => {
                (GameError::UnsupportedAction.into(), effects)
            }
        }
    }

    fn handle_timer(&mut self, generation: u64) -> Effects {
        let mut effects = Effects::none();
        if generation != self.timer_generation {
            debug!(
                generation,
                current = self.timer_generation,
                "stale timer fire ignored"
            );
            return effects;
        }
        match self.state {
            // Deadline hit with unanswered players still out there.
            ToohakState::QuestionOpen => self.settle_round(&mut effects),
            // Settle pause over; deal the next question.
            ToohakState::Settling => self.open_round(&mut effects),
            _ => {}
        }
        effects
    }

    fn player_left(&mut self, player: PlayerId) -> Effects {
        let mut effects = Effects::none();
        let Some(seat) = self.seat_mut(player) else {
            return effects;
        };
        if !seat.seated {
            return effects;
        }
        seat.seated = false;
        debug!(player = %player, "player left mid-game");

        if self.state == ToohakState::Concluded {
            return effects;
        }
        if self.seats.iter().all(|seat| !seat.seated) {
            self.conclude_with(&mut effects, "All players left the game.");
        } else if self.state == ToohakState::QuestionOpen && self.all_seated_answered() {
            // The departure may have been the last unanswered player.
            self.settle_round(&mut effects);
        }
        effects
    }

    fn conclude(&mut self, reason: &str) -> Effects {
        let mut effects = Effects::none();
        if self.state == ToohakState::Concluded {
            return effects;
        }
        self.conclude_with(&mut effects, reason);
        effects
    }

    fn client_state(&self) -> serde_json::Value {
        let question = self.current_question().map(|question| {
            let mut view = serde_json::json!({
                "text": question.text,
                "options": question.options,
            });
            if self.state != ToohakState::QuestionOpen {
                view["correctOptionIndex"] =
                    serde_json::json!(question.correct_option_index);
            }
            view
        });
        serde_json::json!({
            "gameKind": GameKind::Toohak,
            "status": self.status(),
            "questionRef": self.round,
            "totalQuestions": self.options.total_questions,
            "question": question,
            "players": self.round_views(),
            "adminIds": self.admins,
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
