//! Error types for loading levels and parsing move lists.

use thiserror::Error;

use crate::terrain::Position;

/// Errors raised while reading a level or a move list.
///
/// An unreachable goal is not an error: the solver reports it as an empty
/// solution.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The level has no rows.
    #[error("level is empty")]
    Empty,

    #[error("unknown tile {tile:?} at row {row}, column {col}")]
    UnknownTile { row: usize, col: usize, tile: char },

    /// No tile carries the given marker (`S` or `T`).
    #[error("level has no {0:?} tile")]
    Missing(char),

    #[error("level has more than one {marker:?} tile: {first} and {second}")]
    Duplicate {
        marker: char,
        first: Position,
        second: Position,
    },

    #[error("unknown move {0:?}")]
    UnknownMove(String),
}

/// Result type alias for level operations
pub type Result<T> = std::result::Result<T, LevelError>;
