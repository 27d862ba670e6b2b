//! Round scheduling, the worker pool, and shared win-rate statistics.
//!
//! Each worker thread owns its games outright: a fresh [`GameState`] and a
//! fresh pair of [`BotProcess`] handles per game. The only state shared
//! across workers is [`ArenaStats`], updated once per completed round and
//! reported as a live confidence estimate.
//!
//! [`GameState`]: oware_core::GameState

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crate::bot_process::{BotProcess, LaunchError};
use crate::match_runner::{GameOutcome, MatchRunner, TurnDeadlines};

/// Number of competitors; one round plays one game per starting seat.
pub const SEATS: usize = 2;

/// Arena-wide configuration.
pub struct ArenaConfig {
    /// The two bot executables, in original-identity order.
    pub bot_paths: [PathBuf; SEATS],
    /// Size of the worker pool.
    pub workers: usize,
    /// Per-turn reply budgets passed to every match runner.
    pub deadlines: TurnDeadlines,
}

/// Points earned in one round, credited to original identities.
///
/// Points travel in half-point units so the shared accumulators can stay
/// integral atomics: a win is 2, a draw 1 to each side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundPoints {
    /// Half-points per original identity.
    pub half_points: [u64; SEATS],
    /// Drawn games in the round.
    pub draws: u64,
}

/// Statistics shared by every worker for the lifetime of a run.
pub struct ArenaStats {
    games: AtomicU64,
    draws: AtomicU64,
    half_points: [AtomicU64; SEATS],
    print_lock: Mutex<()>,
}

/// A consistent-enough view of the counters plus the derived estimate.
#[derive(Debug, Clone, Copy)]
pub struct StatsSnapshot {
    /// Completed games.
    pub games: u64,
    /// Drawn games.
    pub draws: u64,
    /// Points per original identity (win 1.0, draw 0.5).
    pub points: [f64; SEATS],
    /// Bot 0's observed win probability `p`.
    pub win_rate: f64,
    /// Standard error `sqrt(p(1-p)/games)`.
    pub sigma: f64,
    /// Normal-approximation probability that bot 0 is truly better.
    pub better: f64,
}

impl ArenaStats {
    /// Fresh, all-zero statistics.
    pub fn new() -> Self {
        Self {
            games: AtomicU64::new(0),
            draws: AtomicU64::new(0),
            half_points: [AtomicU64::new(0), AtomicU64::new(0)],
            print_lock: Mutex::new(()),
        }
    }

    /// Folds one round's points into the shared counters.
    pub fn record_round(&self, round: RoundPoints) {
        for (slot, &earned) in self.half_points.iter().zip(&round.half_points) {
            slot.fetch_add(earned, Ordering::Relaxed);
        }
        self.games.fetch_add(SEATS as u64, Ordering::Relaxed);
        self.draws.fetch_add(round.draws, Ordering::Relaxed);
    }

    /// Completed games so far.
    pub fn games(&self) -> u64 {
        self.games.load(Ordering::Relaxed)
    }

    /// Computes the live estimate from the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let games = self.games.load(Ordering::Relaxed);
        let draws = self.draws.load(Ordering::Relaxed);
        let points = [
            self.half_points[0].load(Ordering::Relaxed) as f64 / 2.0,
            self.half_points[1].load(Ordering::Relaxed) as f64 / 2.0,
        ];
        let win_rate = points[0] / games as f64;
        let sigma = (win_rate * (1.0 - win_rate) / games as f64).sqrt();
        let better =
            0.5 + 0.5 * libm::erf((win_rate - 0.5) / (std::f64::consts::SQRT_2 * sigma));
        StatsSnapshot {
            games,
            draws,
            points,
            win_rate,
            sigma,
            better,
        }
    }
}

impl Default for ArenaStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a game-local winning seat back to an original identity, undoing
/// the round's seat rotation.
fn credited_identity(seat: usize, rotation: usize) -> usize {
    (seat + rotation) % SEATS
}

/// Runs rounds across a pool of workers until asked to stop.
pub struct Arena {
    config: ArenaConfig,
    runner: MatchRunner,
    stats: ArenaStats,
    stop: Arc<AtomicBool>,
}

impl Arena {
    /// Builds an arena; `stop` is the shared cancellation flag, polled at
    /// round boundaries only, so in-flight games always complete.
    pub fn new(config: ArenaConfig, stop: Arc<AtomicBool>) -> Self {
        let runner = MatchRunner::new(config.deadlines);
        Self {
            config,
            runner,
            stats: ArenaStats::new(),
            stop,
        }
    }

    /// The shared statistics block.
    pub fn stats(&self) -> &ArenaStats {
        &self.stats
    }

    /// Plays one round: one game per starting-seat rotation, so each bot
    /// moves first equally often. Launch failure is fatal, not per-game.
    pub fn play_round(&self) -> Result<RoundPoints, LaunchError> {
        let mut round = RoundPoints::default();
        for rotation in 0..SEATS {
            let mut bots = [
                self.launch_seat(0, rotation)?,
                self.launch_seat(1, rotation)?,
            ];
            match self.runner.play_game(&mut bots) {
                GameOutcome::Draw => {
                    for earned in &mut round.half_points {
                        *earned += 1;
                    }
                    round.draws += 1;
                }
                GameOutcome::Win(seat) => {
                    round.half_points[credited_identity(seat, rotation)] += 2;
                }
            }
        }
        Ok(round)
    }

    fn launch_seat(&self, seat: usize, rotation: usize) -> Result<BotProcess, LaunchError> {
        let path = &self.config.bot_paths[credited_identity(seat, rotation)];
        BotProcess::launch(seat, path)
    }

    /// Runs the worker pool until the stop flag is observed. The first
    /// launch failure stops every worker and is returned.
    pub fn run(&self) -> Result<(), LaunchError> {
        thread::scope(|scope| {
            let handles: Vec<_> = (0..self.config.workers.max(1))
                .map(|_| scope.spawn(|| self.worker_loop()))
                .collect();
            let mut result = Ok(());
            for handle in handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        if result.is_ok() {
                            result = Err(e);
                        }
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            result
        })
    }

    fn worker_loop(&self) -> Result<(), LaunchError> {
        while !self.stop.load(Ordering::Relaxed) {
            let round = match self.play_round() {
                Ok(round) => round,
                Err(e) => {
                    // Configuration error: wind down the whole arena.
                    self.stop.store(true, Ordering::Relaxed);
                    return Err(e);
                }
            };
            self.stats.record_round(round);
            self.report();
        }
        Ok(())
    }

    /// Prints the live confidence line. The lock only serializes output
    /// across workers; reporting order is not otherwise meaningful.
    fn report(&self) {
        let _guard = self
            .stats
            .print_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let snap = self.stats.snapshot();
        println!(
            "Wins:{:.2}+-{:.2}% Games:{} Draws:{} {:.2}% chance that {} is better",
            100.0 * snap.win_rate,
            100.0 * snap.sigma,
            snap.games,
            snap.draws,
            100.0 * snap.better,
            self.config.bot_paths[0].display()
        );
    }
}
