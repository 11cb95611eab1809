//! Replays a move list against a puzzle and reports where it ends.
//!
//! Used to check solutions produced elsewhere (or typed by hand) without
//! running a search.

use serde::Serialize;

use crate::search::Puzzle;

/// Outcome of replaying a move list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStatus {
    /// Every move was legal and the final state is a goal
    Reached,
    /// A move would have left the terrain
    FellOff,
    /// Every move was legal but the final state is not a goal
    NotAtGoal,
}

/// Result of replaying a move list
#[derive(Debug, Clone)]
pub struct ReplayResult<S> {
    pub status: ReplayStatus,
    /// Last legal state reached
    pub final_state: S,
    /// Moves applied before stopping
    pub moves_applied: usize,
    /// Zero-based index of the illegal move, if any
    pub failed_at_step: Option<usize>,
}

impl<S> ReplayResult<S> {
    pub fn reached_goal(&self) -> bool {
        self.status == ReplayStatus::Reached
    }
}

/// Apply `moves` in order from the puzzle's start state.
///
/// A move is legal exactly when the puzzle lists it among the legal
/// neighbors of the current state.
pub fn replay<P>(puzzle: &P, moves: &[P::Move]) -> ReplayResult<P::State>
where
    P: Puzzle,
    P::Move: PartialEq,
{
    let mut state = puzzle.start();

    for (step, mv) in moves.iter().enumerate() {
        let next = puzzle
            .legal_neighbors(&state)
            .into_iter()
            .find(|(_, candidate)| candidate == mv);

        match next {
            Some((next_state, _)) => state = next_state,
            None => {
                return ReplayResult {
                    status: ReplayStatus::FellOff,
                    final_state: state,
                    moves_applied: step,
                    failed_at_step: Some(step),
                }
            }
        }
    }

    let status = if puzzle.is_goal(&state) {
        ReplayStatus::Reached
    } else {
        ReplayStatus::NotAtGoal
    };
    ReplayResult {
        status,
        final_state: state,
        moves_applied: moves.len(),
        failed_at_step: None,
    }
}

/// Simple verification: does the move list solve the puzzle?
pub fn verify_solution<P>(puzzle: &P, moves: &[P::Move]) -> bool
where
    P: Puzzle,
    P::Move: PartialEq,
{
    replay(puzzle, moves).reached_goal()
}
