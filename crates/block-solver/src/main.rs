//! CLI entry point for the block solver.
//!
//! Usage:
//!   block-solver solve <level> [--max-moves <n>] [--timeout <seconds>]
//!   block-solver verify <level> --moves right,down,...
//!   block-solver explore <level> [--max-moves <n>]
//!
//! Pass `--stdin` instead of a path to read the level from stdin. Results
//! are printed to stdout as JSON; logs go to stderr (see `RUST_LOG`).

use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use block_solver::{
    level_sizes, replay, solve, Block, Level, LevelError, Move, ReplayStatus, SolverConfig,
};

#[derive(Parser)]
#[command(name = "block-solver")]
#[command(about = "Shortest-path solver for block-tilting terrain puzzles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct LevelInput {
    /// Path to a level file (.json or plain text grid)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Read the level from stdin instead of a file
    #[arg(long)]
    stdin: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find a shortest move sequence from start to goal
    Solve {
        #[command(flatten)]
        input: LevelInput,

        /// Give up on solutions longer than this
        #[arg(long)]
        max_moves: Option<usize>,

        /// Maximum search time in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Replay a move list and check that it reaches the goal
    Verify {
        #[command(flatten)]
        input: LevelInput,

        /// Comma-separated moves (left, right, up, down or l, r, u, d)
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        moves: Vec<String>,
    },
    /// Count reachable states per move count
    Explore {
        #[command(flatten)]
        input: LevelInput,

        /// Stop after this many moves
        #[arg(long)]
        max_moves: Option<usize>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveOutput {
    solvable: bool,
    moves: Vec<Move>,
    length: usize,
    search_exhausted: bool,
    states_explored: usize,
    states_discovered: usize,
    levels_expanded: usize,
    time_elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyOutput {
    valid: bool,
    status: ReplayStatus,
    final_block: Block,
    moves_applied: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_at_step: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExploreOutput {
    reachable_states: usize,
    max_depth: usize,
    states_per_depth: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    passable_cells: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    };
    process::exit(code);
}

fn run(command: Commands) -> Result<i32, LevelError> {
    match command {
        Commands::Solve {
            input,
            max_moves,
            timeout,
        } => {
            let level = load_level(&input)?;
            let config = SolverConfig {
                max_moves,
                timeout: timeout.map(Duration::from_secs),
            };

            let result = solve(&level, &config);
            let moves = result.moves().to_vec();
            print_json(&SolveOutput {
                solvable: result.is_solved(),
                length: moves.len(),
                moves,
                search_exhausted: result.search_exhausted,
                states_explored: result.states_explored,
                states_discovered: result.states_discovered,
                levels_expanded: result.levels_expanded,
                time_elapsed_ms: result.time_elapsed_ms,
            })?;

            Ok(if result.is_solved() { 0 } else { 1 })
        }

        Commands::Verify { input, moves } => {
            let level = load_level(&input)?;
            let moves = moves
                .iter()
                .filter(|m| !m.trim().is_empty())
                .map(|m| m.parse::<Move>())
                .collect::<Result<Vec<_>, _>>()?;

            let result = replay(&level, &moves);
            print_json(&VerifyOutput {
                valid: result.reached_goal(),
                status: result.status,
                final_block: result.final_state,
                moves_applied: result.moves_applied,
                failed_at_step: result.failed_at_step,
            })?;

            Ok(if result.reached_goal() { 0 } else { 1 })
        }

        Commands::Explore { input, max_moves } => {
            let level = load_level(&input)?;
            let sizes = level_sizes(&level, max_moves);
            print_json(&ExploreOutput {
                reachable_states: sizes.iter().sum(),
                max_depth: sizes.len().saturating_sub(1),
                states_per_depth: sizes,
                passable_cells: level.terrain.passable_cells(),
            })?;

            Ok(0)
        }
    }
}

fn load_level(input: &LevelInput) -> Result<Level, LevelError> {
    if input.stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Level::from_source(&buffer)
    } else if let Some(path) = &input.file {
        Level::load(path)
    } else {
        eprintln!("Error: Must provide either a file path or --stdin");
        process::exit(2);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), LevelError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
