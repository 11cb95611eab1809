//! Shortest-path solver for block-tilting terrain puzzles.
//!
//! The [`search`] module is a generic level-synchronous breadth-first
//! search over any [`Puzzle`]. The [`terrain`] module supplies the block
//! game: a 1x1x2 block tilted across a grid of passable cells.

pub mod error;
pub mod executor;
pub mod search;
pub mod solver;
pub mod terrain;

// Re-export main types
pub use error::{LevelError, Result};
pub use executor::{replay, verify_solution, ReplayResult, ReplayStatus};
pub use search::{
    neighbors_with_history, new_neighbors_only, paths_from_start, paths_to_goal, solution,
    Frontier, History, Path, Puzzle,
};
pub use solver::{level_sizes, solve, SolverConfig, SolverResult};
pub use terrain::{Block, Level, LevelFile, Move, Position, Terrain};
