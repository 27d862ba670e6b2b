//! Turn protocol and per-game driver.
//!
//! A [`MatchRunner`] alternates turns between two launched bots: it feeds
//! the board, collects a reply under a deadline, classifies protocol
//! failures, advances the rules engine, and declares the outcome. A bot
//! that times out, replies with an unplayable move, or cannot be fed is
//! killed for the rest of the game; it is never retried or revived.

use std::io;
use std::time::{Duration, Instant};

use oware_core::{encode_board, parse_move, GameState, Winner};
use thiserror::Error;
use tracing::{debug, warn};

use crate::bot_process::{BotProcess, PipeEvent};

/// Reply budget for the very first turn of a game (bot warm-up allowance).
pub const FIRST_TURN_DEADLINE: Duration = Duration::from_secs(10);
/// Reply budget for every later turn.
pub const TURN_DEADLINE: Duration = Duration::from_millis(500);

/// Per-turn reply budgets.
#[derive(Debug, Clone, Copy)]
pub struct TurnDeadlines {
    /// Budget for turn 1.
    pub first_turn: Duration,
    /// Budget for turns after the first.
    pub later_turns: Duration,
}

impl Default for TurnDeadlines {
    fn default() -> Self {
        Self {
            first_turn: FIRST_TURN_DEADLINE,
            later_turns: TURN_DEADLINE,
        }
    }
}

/// A protocol failure by one bot on one turn. Each kills the offender.
#[derive(Error, Debug)]
pub enum TurnError {
    /// No parseable reply arrived within the turn's budget.
    #[error("bot {seat} timed out on turn {turn}")]
    Timeout {
        /// Offending seat.
        seat: usize,
        /// Turn the budget lapsed on.
        turn: u32,
    },
    /// The reply parsed as an integer but is not a playable house.
    #[error("bot {seat} sent unplayable move {house} on turn {turn}")]
    MalformedReply {
        /// Offending seat.
        seat: usize,
        /// Turn of the reply.
        turn: u32,
        /// The index the bot asked for.
        house: i64,
    },
    /// The turn's board could not be written to the bot's stdin.
    #[error("bot {seat} could not be fed on turn {turn}: {source}")]
    FeedFailure {
        /// Offending seat.
        seat: usize,
        /// Turn of the failed write.
        turn: u32,
        /// Underlying pipe error.
        source: io::Error,
    },
    /// The bot's stderr channel could not be drained.
    #[error("bot {seat} stderr could not be drained on turn {turn}: {source}")]
    DiagnosticDrainFailure {
        /// Offending seat.
        seat: usize,
        /// Turn of the failed drain.
        turn: u32,
        /// Underlying pipe error.
        source: io::Error,
    },
}

/// Result of one finished game, in game-local seats (0 moved first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    /// The given seat won.
    Win(usize),
    /// Nobody did.
    Draw,
}

/// Drives one full game between two launched bots.
pub struct MatchRunner {
    deadlines: TurnDeadlines,
}

impl MatchRunner {
    /// Creates a runner with the given reply budgets.
    pub fn new(deadlines: TurnDeadlines) -> Self {
        Self { deadlines }
    }

    /// Plays a game to completion and returns the outcome.
    ///
    /// The loop has no bound of its own: games end through the rules
    /// engine's own termination conditions or through bot deaths.
    pub fn play_game(&self, bots: &mut [BotProcess; 2]) -> GameOutcome {
        let mut state = GameState::new();
        let mut active = 0usize;
        loop {
            let turn = state.turn();
            let mut house = None;
            if bots[active].is_alive() {
                match self.take_turn(&state, &mut bots[active]) {
                    Ok(mv) => house = Some(mv),
                    Err(err) => {
                        warn!(bot = %bots[active].name, "{err}");
                        bots[active].terminate(turn);
                    }
                }
            }

            // Liveness verdict comes before the move is simulated, so a dead
            // bot's stale or partial reply never reaches the engine.
            let alive = [bots[0].is_alive(), bots[1].is_alive()];
            match alive {
                [false, false] => return GameOutcome::Draw,
                [true, false] => return GameOutcome::Win(0),
                [false, true] => return GameOutcome::Win(1),
                [true, true] => {}
            }

            if let Some(house) = house {
                state.apply_move(house);
                if state.is_game_over() {
                    return outcome_from_state(&state);
                }
            }
            active = (active + 1) % 2;
        }
    }

    /// Runs one bot's turn: feed, collect under deadline, drain stderr,
    /// validate the move against the engine.
    fn take_turn(&self, state: &GameState, bot: &mut BotProcess) -> Result<usize, TurnError> {
        let seat = bot.seat;
        let turn = state.turn();

        bot.feed(&encode_board(state))
            .map_err(|source| TurnError::FeedFailure { seat, turn, source })?;

        let budget = if turn == 1 {
            self.deadlines.first_turn
        } else {
            self.deadlines.later_turns
        };
        let deadline = Instant::now() + budget;
        let mut reply = String::new();
        let collected = loop {
            if let Ok(house) = parse_move(&reply) {
                break Ok(house);
            }
            let now = Instant::now();
            if now >= deadline {
                break Err(TurnError::Timeout { seat, turn });
            }
            match bot.wait_stdout(deadline - now) {
                PipeEvent::Data(bytes) => reply.push_str(&String::from_utf8_lossy(&bytes)),
                // The pipe can produce nothing further; whatever is buffered
                // failed to parse, so the reply will never complete.
                PipeEvent::Idle | PipeEvent::Closed => {
                    break Err(TurnError::Timeout { seat, turn })
                }
            }
        };

        // Stderr is emptied every turn, even a failed one, so the bot can
        // never block on a full diagnostic buffer.
        let drained = bot.drain_stderr();
        let house = collected?;
        match drained {
            Ok(diagnostics) => {
                if !diagnostics.is_empty() {
                    debug!(bot = %bot.name, turn, "stderr: {}", diagnostics.trim_end());
                }
            }
            Err(source) => {
                return Err(TurnError::DiagnosticDrainFailure { seat, turn, source })
            }
        }

        // A parseable index must still be a playable house; the sowing loop
        // does not bound-check, so out-of-range or illegal indices are a
        // protocol failure, not an engine input.
        usize::try_from(house)
            .ok()
            .filter(|h| state.valid_moves().contains(h))
            .ok_or(TurnError::MalformedReply { seat, turn, house })
    }
}

impl Default for MatchRunner {
    fn default() -> Self {
        Self::new(TurnDeadlines::default())
    }
}

/// Maps the engine's perspective-relative winner to a game-local seat.
fn outcome_from_state(state: &GameState) -> GameOutcome {
    let current_seat = if state.is_white_to_move() { 0 } else { 1 };
    match state.winner() {
        Winner::CurrentPlayer => GameOutcome::Win(current_seat),
        Winner::Opponent => GameOutcome::Win(1 - current_seat),
        Winner::Draw => GameOutcome::Draw,
    }
}
