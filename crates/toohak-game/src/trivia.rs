//! The Trivia variant: solo practice inside a shared room.
//!
//! There is no shared round clock and no broadcast questions. Each player
//! asks for a question, answers it, and is immediately dealt the next one
//! with personal feedback, until their own budget runs out. Players finish
//! at different times; the game as a whole concludes once every seated
//! player is done.
//!
//! The variant exists to show the [`GameInstance`] contract hosting a game
//! that is not round-based: every event it emits is directed at a single
//! player until the final whole-room conclusion.

use std::sync::Arc;

use tracing::{debug, warn};

use toohak_protocol::{GameKind, GameStatus, PlayerId, PlayerInfo, ScoreEntry, ServerEvent};

use crate::{
    ActionOutcome, DeparturePolicy, Effects, GameError, GameInstance, GameOptions,
    PlayerAction, QuestionBank,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriviaState {
    New,
    Ready,
    Running,
    Concluded,
}

#[derive(Debug)]
struct TriviaSeat {
    id: PlayerId,
    display_name: String,
    score: u32,
    /// Questions left in this player's budget.
    remaining: u32,
    /// This player's own question counter; their `question_ref`.
    dealt: u32,
    /// Bank index of the question currently dealt to this player.
    pending: Option<usize>,
    /// Previous bank index, excluded from this player's next draw.
    previous: Option<usize>,
    seated: bool,
}

/// A running Trivia game, one independent track per player.
pub struct TriviaGame {
    bank: Arc<QuestionBank>,
    options: GameOptions,
    state: TriviaState,
    seats: Vec<TriviaSeat>,
    admins: Vec<PlayerId>,
}

impl TriviaGame {
    pub fn new(bank: Arc<QuestionBank>, options: GameOptions) -> Self {
        TriviaGame {
            bank,
            options,
            state: TriviaState::New,
            seats: Vec::new(),
            admins: Vec::new(),
        }
    }

    fn seat_index(&self, player: PlayerId) -> Option<usize> {
        self.seats
            .iter()
            .position(|seat| seat.id == player && seat.seated)
    }

    /// Sends the seat's pending question, drawing a fresh one first if
    /// none is pending. Re-requests re-deal the same question, which makes
    /// the operation safe to retry after a lost frame.
    fn deal(&mut self, index: usize, effects: &mut Effects) {
        let previous = self.seats[index].previous;
        let bank_index = match self.seats[index].pending {
            Some(bank_index) => bank_index,
            None => {
                let (drawn, _) = self.bank.draw(previous);
                self.seats[index].pending = Some(drawn);
                drawn
            }
        };
        let Some(question) = self.bank.get(bank_index) else {
            warn!(bank_index, "pending question missing from the bank");
            return;
        };
        let text = question.text.clone();
        let options = question.options.clone();
        let seat = &self.seats[index];
        effects.direct(
            seat.id,
            ServerEvent::NewQuestion {
                question_ref: seat.dealt,
                text,
                options,
                deadline_ms: None,
            },
        );
    }

    fn standings(&self) -> Vec<ScoreEntry> {
        self.seats
            .iter()
            .filter(|seat| match self.options.departure_policy {
                DeparturePolicy::RetainScore => true,
                DeparturePolicy::Forfeit => seat.seated,
            })
            .map(|seat| ScoreEntry {
                player_id: seat.id,
                display_name: seat.display_name.clone(),
                score: seat.score,
            })
            .collect()
    }

    /// True when every seated player has exhausted their budget. Empty
    /// seating never concludes the game through this check.
    fn all_seated_done(&self) -> bool {
        let mut any = false;
        for seat in self.seats.iter().filter(|seat| seat.seated) {
            if seat.remaining > 0 {
                return false;
            }
            any = true;
        }
        any
    }

    fn conclude_with(&mut self, effects: &mut Effects, reason: &str) {
        self.state = TriviaState::Concluded;
        effects.cancel_timer();
        effects.broadcast(ServerEvent::GameConcluded {
            reason: reason.to_owned(),
            final_scores: self.standings(),
        });
        debug!(reason, "trivia game concluded");
    }

    fn handle_request(&mut self, player: PlayerId) -> (ActionOutcome, Effects) {
        let mut effects = Effects::none();
        if self.state != TriviaState::Running {
            return (GameError::NotRunning.into(), effects);
        }
        let Some(index) = self.seat_index(player) else {
            return (GameError::UnknownPlayer.into(), effects);
        };
        if self.seats[index].remaining == 0 {
            return (GameError::BudgetExhausted.into(), effects);
        }
        self.deal(index, &mut effects);
        (ActionOutcome::accepted("Question dealt."), effects)
    }

    fn handle_submit(
        &mut self,
        player: PlayerId,
        question_ref: u32,
        option_index: usize,
    ) -> (ActionOutcome, Effects) {
        let mut effects = Effects::none();
        if self.state != TriviaState::Running {
            return (GameError::NotRunning.into(), effects);
        }
        let Some(index) = self.seat_index(player) else {
            return (GameError::UnknownPlayer.into(), effects);
        };
        let Some(bank_index) = self.seats[index].pending else {
            return (GameError::NoQuestionPending.into(), effects);
        };
        if question_ref != self.seats[index].dealt {
            return (GameError::StaleRound.into(), effects);
        }
        let Some(question) = self.bank.get(bank_index) else {
            warn!(bank_index, "pending question missing from the bank");
            return (GameError::NotRunning.into(), effects);
        };
        if option_index >= question.options.len() {
            return (GameError::InvalidOption(option_index).into(), effects);
        }
        let correct = option_index == question.correct_option_index;

        let seat = &mut self.seats[index];
        if correct {
            seat.score += 1;
        }
        seat.previous = seat.pending.take();
        seat.dealt += 1;
        seat.remaining -= 1;
        let feedback = serde_json::json!({
            "correct": correct,
            "score": seat.score,
            "questionsRemaining": seat.remaining,
        });
        debug!(player = %player, correct, remaining = seat.remaining, "trivia answer recorded");

        if self.seats[index].remaining > 0 {
            self.deal(index, &mut effects);
        } else {
            let seat = &self.seats[index];
            effects.direct(
                seat.id,
                ServerEvent::GameConcluded {
                    reason: "You have answered all your questions.".to_owned(),
                    final_scores: vec![ScoreEntry {
                        player_id: seat.id,
                        display_name: seat.display_name.clone(),
                        score: seat.score,
                    }],
                },
            );
            if self.all_seated_done() {
                self.conclude_with(&mut effects, "All players finished their questions.");
            }
        }
        (ActionOutcome::accepted_with("Answer submitted.", feedback), effects)
    }
}

impl GameInstance for TriviaGame {
    fn kind(&self) -> GameKind {
        GameKind::Trivia
    }

    fn status(&self) -> GameStatus {
        match self.state {
            TriviaState::New => GameStatus::WaitingToStart,
            TriviaState::Ready => GameStatus::Ready,
            TriviaState::Running => GameStatus::InGame,
            TriviaState::Concluded => GameStatus::Concluded,
        }
    }

    fn initialize(
        &mut self,
        players: &[PlayerInfo],
        admins: &[PlayerId],
    ) -> Result<(), GameError> {
        if self.state != TriviaState::New {
            return Err(GameError::AlreadyInitialized);
        }
        self.seats = players
            .iter()
            .map(|player| TriviaSeat {
                id: player.id,
                display_name: player.display_name.clone(),
                score: 0,
                remaining: self.options.trivia_questions,
                dealt: 0,
                pending: None,
                previous: None,
                seated: true,
            })
            .collect();
        self.admins = admins.to_vec();
        self.state = TriviaState::Ready;
        debug!(players = self.seats.len(), "trivia game initialized");
        Ok(())
    }

    /// Transitions to running. Questions are not dealt here: each player
    /// pulls their first one with a question request.
    fn start_cycle(&mut self) -> Effects {
        if self.state != TriviaState::Ready {
            warn!(status = %self.status(), "start_cycle called outside the ready state");
            return Effects::none();
        }
        self.state = TriviaState::Running;
        Effects::none()
    }

    fn handle_action(
        &mut self,
        player: PlayerId,
        action: PlayerAction,
    ) -> (ActionOutcome, Effects) {
        match action {
            PlayerAction::SubmitAnswer {
                question_ref,
                option_index,
            } => self.handle_submit(player, question_ref, option_index),
            PlayerAction::RequestQuestion => self.handle_request(player),
        }
    }

    fn handle_timer(&mut self, generation: u64) -> Effects {
        // Trivia never arms timers; a fire here is a stale leftover.
        debug!(generation, "timer fire ignored by trivia");
        Effects::none()
    }

    fn player_left(&mut self, player: PlayerId) -> Effects {
        let mut effects = Effects::none();
        let Some(seat) = self.seats.iter_mut().find(|seat| seat.id == player) else {
            return effects;
        };
        if !seat.seated {
            return effects;
        }
        seat.seated = false;
        debug!(player = %player, "player left mid-game");

        if self.state != TriviaState::Running {
            return effects;
        }
        if self.seats.iter().all(|seat| !seat.seated) {
            self.conclude_with(&mut effects, "All players left the game.");
        } else if self.all_seated_done() {
            // The departed player was the only one still answering.
            self.conclude_with(&mut effects, "All players finished their questions.");
        }
        effects
    }

    fn conclude(&mut self, reason: &str) -> Effects {
        let mut effects = Effects::none();
        if self.state == TriviaState::Concluded {
            return effects;
        }
        self.conclude_with(&mut effects, reason);
        effects
    }

    fn client_state(&self) -> serde_json::Value {
        let players: Vec<serde_json::Value> = self
            .seats
            .iter()
            .map(|seat| {
                serde_json::json!({
                    "playerId": seat.id,
                    "displayName": seat.display_name,
                    "score": seat.score,
                    "questionsRemaining": seat.remaining,
                    "questionPending": seat.pending.is_some(),
                })
            })
            .collect();
        serde_json::json!({
            "gameKind": GameKind::Trivia,
            "status": self.status(),
            "players": players,
            "adminIds": self.admins,
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
