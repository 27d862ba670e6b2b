//! Wire protocol between the arena and bot subprocesses.
//!
//! Per turn the arena writes the 12 perspective-relative seed counts,
//! space-separated with a trailing space, to the bot's stdin. The bot
//! answers on stdout with anything whose leading token parses as an
//! integer: the chosen house index.

use thiserror::Error;

use crate::state::GameState;

/// A bot reply that does not yet carry a parseable move.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The reply contains no token at all.
    #[error("reply holds no token yet")]
    Empty,
    /// The leading token is not an integer.
    #[error("leading token {0:?} is not an integer")]
    NotAnInteger(String),
}

/// Encodes a board the way bots expect it on stdin.
///
/// Twelve integers, each followed by a single space: the current player's
/// six houses, then the opponent's six. No newline.
pub fn encode_board(state: &GameState) -> String {
    let mut out = String::with_capacity(3 * state.seeds().len());
    for count in state.seeds() {
        out.push_str(&count.to_string());
        out.push(' ');
    }
    out
}

/// Parses the leading token of an accumulated bot reply as a move.
///
/// Succeeds the moment the first whitespace-delimited token is an integer.
/// No range or legality check happens here; that is the match runner's
/// decision once a token parses.
pub fn parse_move(reply: &str) -> Result<i64, ProtocolError> {
    let token = reply.split_whitespace().next().ok_or(ProtocolError::Empty)?;
    token
        .parse::<i64>()
        .map_err(|_| ProtocolError::NotAnInteger(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_initial_board() {
        let state = GameState::new();
        assert_eq!(encode_board(&state), "4 4 4 4 4 4 4 4 4 4 4 4 ");
    }

    #[test]
    fn encode_is_perspective_relative() {
        let mut state = GameState::new();
        state.apply_move(0);
        assert_eq!(encode_board(&state), "4 4 4 4 4 4 0 5 5 5 5 4 ");
    }

    #[test]
    fn parse_plain_move() {
        assert_eq!(parse_move("3"), Ok(3));
        assert_eq!(parse_move("  5\n"), Ok(5));
        assert_eq!(parse_move("2 trailing words"), Ok(2));
    }

    #[test]
    fn parse_negative_move() {
        // Negative indices parse; rejecting them is the runner's call.
        assert_eq!(parse_move("-1"), Ok(-1));
    }

    #[test]
    fn parse_rejects_empty_and_garbage() {
        assert_eq!(parse_move(""), Err(ProtocolError::Empty));
        assert_eq!(parse_move("   \n\t"), Err(ProtocolError::Empty));
        assert_eq!(
            parse_move("move 3"),
            Err(ProtocolError::NotAnInteger("move".to_string()))
        );
    }
}
