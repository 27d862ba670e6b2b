//! Rules engine and wire protocol for a two-player Oware variant.
//!
//! This crate provides the pure, I/O-free pieces of the arena:
//! - [`GameState`] for board representation, sowing, capture, and
//!   termination detection
//! - [`encode_board`] / [`parse_move`] for the board encoding fed to bot
//!   subprocesses and the parsing of their replies

mod protocol;
mod state;

pub use protocol::{encode_board, parse_move, ProtocolError};
pub use state::{
    GameState, Winner, BOARD_HOUSES, HOUSES_PER_PLAYER, INITIAL_SEEDS_PER_HOUSE, TURN_LIMIT,
    WIN_THRESHOLD,
};
