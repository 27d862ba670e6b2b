//! Game state and move application.
//!
//! The board is always stored from the point of view of the player to move:
//! houses 0-5 belong to the current player, houses 6-11 to the opponent.
//! Applying a move ends by rotating the board half a turn, so the invariant
//! holds across the whole game.

use std::cmp::Ordering;

/// Number of houses on each side of the board.
pub const HOUSES_PER_PLAYER: usize = 6;
/// Total number of houses on the board.
pub const BOARD_HOUSES: usize = 2 * HOUSES_PER_PLAYER;
/// Seeds placed in every house at game start.
pub const INITIAL_SEEDS_PER_HOUSE: u32 = 4;
/// A game is over once the turn counter exceeds this ceiling.
pub const TURN_LIMIT: u32 = 200;
/// A game is over once either score reaches this many seeds.
pub const WIN_THRESHOLD: u32 = 25;

/// A just-sown opponent house is captured when it holds 2 or 3 seeds.
#[inline]
fn is_capture_count(seed_count: u32) -> bool {
    seed_count == 2 || seed_count == 3
}

/// Game result relative to the current perspective.
///
/// The state only knows which half of the board belongs to the player to
/// move; mapping the result back to an absolute seat is the caller's job,
/// via [`GameState::is_white_to_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    /// The player whose turn it is has the higher score.
    CurrentPlayer,
    /// The opponent has the higher score.
    Opponent,
    /// Scores are tied.
    Draw,
}

/// The full state of one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    /// Seed counts, perspective-relative: `[0..6]` current player, `[6..12]` opponent.
    seeds: [u32; BOARD_HOUSES],
    /// `[current player score, opponent score]`, same perspective convention.
    score: [u32; 2],
    /// True while the first ("white") seat is the current player.
    white_to_move: bool,
    /// Completed-move counter, starting at 1 for a fresh game.
    turn: u32,
    /// Houses the current player may legally play, ascending.
    valid_moves: Vec<usize>,
}

impl GameState {
    /// Creates the initial position: four seeds in every house, turn 1.
    pub fn new() -> Self {
        Self::from_parts(
            [INITIAL_SEEDS_PER_HOUSE; BOARD_HOUSES],
            [0, 0],
            true,
            1,
        )
    }

    /// Builds a state from raw parts, recomputing the valid move list.
    pub fn from_parts(
        seeds: [u32; BOARD_HOUSES],
        score: [u32; 2],
        white_to_move: bool,
        turn: u32,
    ) -> Self {
        let mut state = Self {
            seeds,
            score,
            white_to_move,
            turn,
            valid_moves: Vec::with_capacity(HOUSES_PER_PLAYER),
        };
        state.recompute_valid_moves();
        state
    }

    /// Recomputes which houses the current player may play.
    ///
    /// A house is playable when it holds at least one seed and either the
    /// opponent still holds seeds somewhere, or the final sown seed would
    /// land in opponent territory. A move that leaves a starved opponent
    /// starved is never offered while a feeding alternative exists.
    pub fn recompute_valid_moves(&mut self) {
        self.valid_moves.clear();
        let opponent_has_seeds = self.seeds[HOUSES_PER_PLAYER..].iter().any(|&s| s > 0);
        for house in 0..HOUSES_PER_PLAYER {
            let count = self.seeds[house];
            // house + count past the last own house means sowing reaches the opponent
            if count > 0 && (opponent_has_seeds || house as u32 + count >= HOUSES_PER_PLAYER as u32)
            {
                self.valid_moves.push(house);
            }
        }
    }

    /// Rotates the board to the other player's perspective.
    fn reverse(&mut self) {
        self.seeds.rotate_left(HOUSES_PER_PLAYER);
        self.score.swap(0, 1);
        self.white_to_move = !self.white_to_move;
        self.recompute_valid_moves();
    }

    /// Applies a move for the current player and flips the perspective.
    ///
    /// `house` must be a member of [`valid_moves`](Self::valid_moves); the
    /// caller is responsible for checking, this only `debug_assert`s it.
    ///
    /// Sowing empties the source house one seed at a time into successive
    /// houses, skipping the source itself. Capture then walks backward from
    /// the last sown house through opponent territory while houses hold 2 or
    /// 3 seeds, banking them — unless that would strip the opponent of every
    /// seed, in which case the whole capture is rolled back (a player may
    /// never take the opponent's last seeds). Finally the perspective flips
    /// and, if the new current player has no legal move, their remaining
    /// seeds are swept into their own score.
    pub fn apply_move(&mut self, house: usize) {
        debug_assert!(
            self.valid_moves.contains(&house),
            "house {house} is not a valid move"
        );

        let mut idx = house;
        while self.seeds[house] > 0 {
            idx = (idx + 1) % BOARD_HOUSES;
            if idx == house {
                // Never sow back into the source house. `house < 6`, so
                // stepping over it stays in bounds.
                idx += 1;
            }
            self.seeds[idx] += 1;
            self.seeds[house] -= 1;
        }

        let mut opponent_before_capture = [0u32; HOUSES_PER_PLAYER];
        opponent_before_capture.copy_from_slice(&self.seeds[HOUSES_PER_PLAYER..]);
        let score_before_capture = self.score[0];
        while idx >= HOUSES_PER_PLAYER && is_capture_count(self.seeds[idx]) {
            self.score[0] += self.seeds[idx];
            self.seeds[idx] = 0;
            idx -= 1;
        }
        if self.seeds[HOUSES_PER_PLAYER..].iter().all(|&s| s == 0) {
            // Forfeiture guard: restore the post-sowing, pre-capture board.
            self.seeds[HOUSES_PER_PLAYER..].copy_from_slice(&opponent_before_capture);
            self.score[0] = score_before_capture;
        }

        self.reverse();
        if self.valid_moves.is_empty() {
            // Terminal starvation: the stranded player banks what remains.
            self.score[0] += self.seeds[..HOUSES_PER_PLAYER].iter().sum::<u32>();
            self.seeds[..HOUSES_PER_PLAYER].fill(0);
        }
        self.turn += 1;
    }

    /// True once the game has ended: no legal move, turn ceiling exceeded,
    /// or either score at the win threshold.
    pub fn is_game_over(&self) -> bool {
        self.valid_moves.is_empty()
            || self.turn > TURN_LIMIT
            || self.score.iter().any(|&s| s >= WIN_THRESHOLD)
    }

    /// Result relative to the current perspective.
    pub fn winner(&self) -> Winner {
        match self.score[0].cmp(&self.score[1]) {
            Ordering::Greater => Winner::CurrentPlayer,
            Ordering::Less => Winner::Opponent,
            Ordering::Equal => Winner::Draw,
        }
    }

    /// Perspective-relative seed counts.
    #[inline]
    pub fn seeds(&self) -> &[u32; BOARD_HOUSES] {
        &self.seeds
    }

    /// Perspective-relative scores.
    #[inline]
    pub fn score(&self) -> &[u32; 2] {
        &self.score
    }

    /// True while the first seat is the current player.
    #[inline]
    pub fn is_white_to_move(&self) -> bool {
        self.white_to_move
    }

    /// Current turn number, starting at 1.
    #[inline]
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Houses the current player may legally play.
    #[inline]
    pub fn valid_moves(&self) -> &[usize] {
        &self.valid_moves
    }

    /// Seeds still on the board, both sides.
    pub fn total_seeds(&self) -> u32 {
        self.seeds.iter().sum()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
