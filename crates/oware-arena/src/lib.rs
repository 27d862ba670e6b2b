//! Oware bot arena.
//!
//! Pits two external bot executables against each other over stdin/stdout
//! pipes, repeatedly and in parallel, to estimate which one plays better.
//!
//! # Modules
//!
//! - [`bot_process`] - lifecycle of one bot subprocess and its pipes
//! - [`match_runner`] - the per-turn protocol and per-game driver
//! - [`arena`] - round scheduling, the worker pool, and live statistics

pub mod arena;
pub mod bot_process;
pub mod match_runner;
