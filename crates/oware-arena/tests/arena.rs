//! Integration tests driving real subprocess bots.
//!
//! The bots are small `/bin/sh` scripts written to a temp directory, so
//! these tests exercise the full stack: process launch, pipe plumbing,
//! deadlines, kill escalation, and round accounting.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use oware_arena::arena::{Arena, ArenaConfig, RoundPoints};
use oware_arena::bot_process::BotProcess;
use oware_arena::match_runner::{GameOutcome, MatchRunner, TurnDeadlines};
use tempfile::TempDir;

/// Replies instantly with house 0, forever. Plays legally for two turns,
/// then house 0 is empty and the reply becomes unplayable.
const HOUSE_ZERO: &str = "while true; do echo 0; sleep 0.01; done";
/// Never writes anything.
const SILENT: &str = "exec sleep 30";
/// Exits immediately without playing.
const CRASH: &str = "exit 0";

fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn fast_deadlines() -> TurnDeadlines {
    TurnDeadlines {
        first_turn: Duration::from_secs(1),
        later_turns: Duration::from_millis(200),
    }
}

fn launch_pair(a: &PathBuf, b: &PathBuf) -> [BotProcess; 2] {
    [
        BotProcess::launch(0, a).unwrap(),
        BotProcess::launch(1, b).unwrap(),
    ]
}

#[test]
fn unplayable_house_kills_the_first_mover() {
    let dir = TempDir::new().unwrap();
    let a = script(&dir, "zero-a.sh", HOUSE_ZERO);
    let b = script(&dir, "zero-b.sh", HOUSE_ZERO);
    let mut bots = launch_pair(&a, &b);

    let outcome = MatchRunner::new(fast_deadlines()).play_game(&mut bots);

    // Turns 1 and 2 are legal; on turn 3 seat 0's house 0 is empty, the
    // reply is unplayable, and the surviving seat wins on the spot even
    // though it would have made the same mistake a turn later.
    assert_eq!(outcome, GameOutcome::Win(1));
    assert_eq!(bots[0].turn_of_death(), Some(3));
    assert_eq!(bots[1].turn_of_death(), None);
}

#[test]
fn silent_bot_loses_by_timeout_at_the_deadline() {
    let dir = TempDir::new().unwrap();
    let a = script(&dir, "silent.sh", SILENT);
    let b = script(&dir, "zero.sh", HOUSE_ZERO);
    let mut bots = launch_pair(&a, &b);

    let deadlines = fast_deadlines();
    let start = Instant::now();
    let outcome = MatchRunner::new(deadlines).play_game(&mut bots);
    let elapsed = start.elapsed();

    assert_eq!(outcome, GameOutcome::Win(1));
    assert_eq!(bots[0].turn_of_death(), Some(1));
    // The loss lands at the first-turn deadline: no sooner, and not
    // meaningfully later.
    assert!(elapsed >= deadlines.first_turn, "declared early: {elapsed:?}");
    assert!(
        elapsed < deadlines.first_turn + Duration::from_secs(2),
        "declared late: {elapsed:?}"
    );
}

#[test]
fn unparseable_chatter_is_a_timeout_not_a_move() {
    let dir = TempDir::new().unwrap();
    let a = script(
        &dir,
        "garbage.sh",
        "while true; do echo banana; sleep 0.01; done",
    );
    let b = script(&dir, "zero.sh", HOUSE_ZERO);
    let mut bots = launch_pair(&a, &b);

    let deadlines = fast_deadlines();
    let start = Instant::now();
    let outcome = MatchRunner::new(deadlines).play_game(&mut bots);

    // Garbage never parses, so the collector keeps waiting until the
    // deadline rather than flagging the reply early.
    assert_eq!(outcome, GameOutcome::Win(1));
    assert!(start.elapsed() >= deadlines.first_turn);
}

#[test]
fn out_of_range_move_is_killed_before_the_deadline() {
    let dir = TempDir::new().unwrap();
    let a = script(&dir, "nine.sh", "while true; do echo 9; sleep 0.01; done");
    let b = script(&dir, "zero.sh", HOUSE_ZERO);
    let mut bots = launch_pair(&a, &b);

    let deadlines = fast_deadlines();
    let start = Instant::now();
    let outcome = MatchRunner::new(deadlines).play_game(&mut bots);

    // "9" parses, fails the playability check, and the bot dies at once -
    // the unplayable index never reaches the sowing loop.
    assert_eq!(outcome, GameOutcome::Win(1));
    assert_eq!(bots[0].turn_of_death(), Some(1));
    assert!(start.elapsed() < deadlines.first_turn);
}

#[test]
fn crashed_opponent_forfeits_without_a_move_being_applied() {
    let dir = TempDir::new().unwrap();
    let a = script(&dir, "zero.sh", HOUSE_ZERO);
    let b = script(&dir, "crash.sh", CRASH);
    let mut bots = launch_pair(&a, &b);

    let outcome = MatchRunner::new(fast_deadlines()).play_game(&mut bots);
    assert_eq!(outcome, GameOutcome::Win(0));
}

#[test]
fn round_handles_draws_and_forfeits_per_identity() {
    let dir = TempDir::new().unwrap();
    let silent = script(&dir, "silent.sh", SILENT);
    let crash = script(&dir, "crash.sh", CRASH);

    let arena = Arena::new(
        ArenaConfig {
            bot_paths: [silent, crash],
            workers: 1,
            deadlines: fast_deadlines(),
        },
        Arc::new(AtomicBool::new(false)),
    );
    let round = arena.play_round().unwrap();

    // Game 1: silent moves first, times out; the crashed bot is already
    // gone, so everyone is dead - a draw. Game 2 (seats rotated): the
    // crash bot would move first but is dead, so silent wins by
    // omission. Identity 0 (silent) ends on 1.5 points.
    assert_eq!(
        round,
        RoundPoints {
            half_points: [3, 1],
            draws: 1,
        }
    );
}

#[test]
fn rotation_credits_each_identity_once() {
    let dir = TempDir::new().unwrap();
    let a = script(&dir, "zero-a.sh", HOUSE_ZERO);
    let b = script(&dir, "zero-b.sh", HOUSE_ZERO);

    let arena = Arena::new(
        ArenaConfig {
            bot_paths: [a, b],
            workers: 1,
            deadlines: fast_deadlines(),
        },
        Arc::new(AtomicBool::new(false)),
    );
    let round = arena.play_round().unwrap();

    // The second mover wins each game; with the seats rotated between
    // games that is each identity exactly once.
    assert_eq!(
        round,
        RoundPoints {
            half_points: [2, 2],
            draws: 0,
        }
    );
}

#[test]
fn run_stops_at_a_round_boundary() {
    let dir = TempDir::new().unwrap();
    let a = script(&dir, "zero-a.sh", HOUSE_ZERO);
    let b = script(&dir, "zero-b.sh", HOUSE_ZERO);

    let stop = Arc::new(AtomicBool::new(false));
    let arena = Arena::new(
        ArenaConfig {
            bot_paths: [a, b],
            workers: 2,
            deadlines: fast_deadlines(),
        },
        stop.clone(),
    );

    thread::scope(|scope| {
        let runner = scope.spawn(|| arena.run());
        // Let at least one round land, then request the stop.
        while arena.stats().games() < 4 {
            thread::sleep(Duration::from_millis(20));
        }
        stop.store(true, Ordering::Relaxed);
        runner.join().unwrap().unwrap();
    });

    let snap = arena.stats().snapshot();
    assert!(snap.games >= 4);
    // Rounds are atomic: games only ever land two at a time.
    assert_eq!(snap.games % 2, 0);
    assert_eq!(snap.points[0] + snap.points[1], snap.games as f64);
}

#[test]
fn launch_failure_aborts_the_run() {
    let dir = TempDir::new().unwrap();
    let a = script(&dir, "zero.sh", HOUSE_ZERO);
    let missing = dir.path().join("no-such-bot");

    let arena = Arena::new(
        ArenaConfig {
            bot_paths: [a, missing.clone()],
            workers: 1,
            deadlines: fast_deadlines(),
        },
        Arc::new(AtomicBool::new(false)),
    );

    let err = arena.run().unwrap_err();
    assert!(err.name.contains("no-such-bot"));
}
