//! Bounded driver around the breadth-first search.
//!
//! [`crate::search::solution`] runs until a goal is found or the state space
//! is exhausted. This module adds the knobs a CLI needs (a move limit and a
//! wall-clock timeout) and reports how much of the space was searched.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::search::{paths_from_start, Puzzle};

/// Configuration for the solver
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Longest solution worth looking for
    pub max_moves: Option<usize>,
    /// Maximum time to search
    pub timeout: Option<Duration>,
}

/// Result of the solver search
#[derive(Debug, Clone)]
pub struct SolverResult<M> {
    /// Shortest move sequence, if one was found within the bounds
    pub solution: Option<Vec<M>>,
    /// Whether every reachable state was visited without hitting a bound
    pub search_exhausted: bool,
    /// States pulled from the frontier
    pub states_explored: usize,
    /// Distinct states discovered, including those scheduled but not pulled
    pub states_discovered: usize,
    /// Frontier levels computed after the start level
    pub levels_expanded: usize,
    /// Time elapsed in milliseconds
    pub time_elapsed_ms: u64,
}

impl<M> SolverResult<M> {
    pub fn is_solved(&self) -> bool {
        self.solution.is_some()
    }

    /// The solution moves, empty when unsolved.
    pub fn moves(&self) -> &[M] {
        self.solution.as_deref().unwrap_or(&[])
    }
}

/// Search for a shortest solution within the configured bounds.
///
/// The frontier yields paths in ascending length, so the first path longer
/// than `max_moves` ends the search.
pub fn solve<P: Puzzle>(puzzle: &P, config: &SolverConfig) -> SolverResult<P::Move> {
    let start_time = Instant::now();
    let deadline = config.timeout.map(|t| start_time + t);

    info!(
        event = "solve_start",
        max_moves = ?config.max_moves,
        timeout_ms = ?config.timeout.map(|t| t.as_millis())
    );

    let mut frontier = paths_from_start(puzzle);
    let mut states_explored = 0;
    let mut solution = None;
    let mut search_exhausted = false;

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            debug!(states_explored, "solver timed out");
            break;
        }

        let Some(path) = frontier.next() else {
            search_exhausted = true;
            break;
        };

        if config.max_moves.is_some_and(|max| path.len() > max) {
            debug!(states_explored, "move limit reached");
            break;
        }

        states_explored += 1;
        if puzzle.is_goal(&path.state) {
            solution = Some(path.history.to_forward());
            break;
        }
    }

    let states_discovered = frontier.explored().len();
    let levels_expanded = frontier.levels_expanded();
    let time_elapsed_ms = start_time.elapsed().as_millis() as u64;
    info!(
        event = "solve_end",
        solved = solution.is_some(),
        length = solution.as_ref().map(Vec::len),
        search_exhausted,
        states_explored,
        states_discovered,
        levels_expanded,
        time_elapsed_ms
    );

    SolverResult {
        solution,
        search_exhausted,
        states_explored,
        states_discovered,
        levels_expanded,
        time_elapsed_ms,
    }
}

/// Number of distinct states first reached at each move count.
///
/// Index `k` of the result counts the states whose shortest path has `k`
/// moves. Stops after `max_moves` when given.
pub fn level_sizes<P: Puzzle>(puzzle: &P, max_moves: Option<usize>) -> Vec<usize> {
    let mut sizes: Vec<usize> = Vec::new();
    for path in paths_from_start(puzzle) {
        if max_moves.is_some_and(|max| path.len() > max) {
            break;
        }
        if sizes.len() <= path.len() {
            sizes.resize(path.len() + 1, 0);
        }
        sizes[path.len()] += 1;
    }
    sizes
}
