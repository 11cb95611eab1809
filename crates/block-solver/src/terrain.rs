//! Terrain and block geometry for the block-tilting game.
//!
//! Levels are read from a plain text grid or from a JSON wrapper around the
//! same rows:
//!
//! ```text
//! ooo-------
//! oSoooo----
//! ooooooooo-
//! -ooooooooo
//! -----ooToo
//! ------ooo-
//! ```
//!
//! `-` is impassable, `o` passable, `S` the start and `T` the goal.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{LevelError, Result};
use crate::search::Puzzle;

/// Position on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// `None` when the row would leave the `i32` range.
    pub fn delta_row(self, d: i32) -> Option<Self> {
        Some(Self::new(self.row.checked_add(d)?, self.col))
    }

    /// `None` when the column would leave the `i32` range.
    pub fn delta_col(self, d: i32) -> Option<Self> {
        Some(Self::new(self.row, self.col.checked_add(d)?))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Tilt direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Left,
    Right,
    Up,
    Down,
}

impl Move {
    /// All moves, in the order neighbors are generated.
    pub const ALL: [Move; 4] = [Move::Left, Move::Right, Move::Up, Move::Down];

    pub fn as_str(self) -> &'static str {
        match self {
            Move::Left => "left",
            Move::Right => "right",
            Move::Up => "up",
            Move::Down => "down",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Move {
    type Err = LevelError;

    /// Accepts full names or their first letter, in any case.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Move::Left),
            "right" | "r" => Ok(Move::Right),
            "up" | "u" => Ok(Move::Up),
            "down" | "d" => Ok(Move::Down),
            _ => Err(LevelError::UnknownMove(s.to_string())),
        }
    }
}

/// A 1x1x2 block occupying one cell (standing) or two adjacent cells (lying).
///
/// `first` is never below or right of `second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Block {
    first: Position,
    second: Position,
}

impl Block {
    /// A block standing upright on `pos`.
    pub fn standing(pos: Position) -> Self {
        Self {
            first: pos,
            second: pos,
        }
    }

    /// A block lying across two orthogonally adjacent cells, in either order.
    pub fn lying(a: Position, b: Position) -> Option<Self> {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let beside = first.row == second.row && first.col.checked_add(1) == Some(second.col);
        let above = first.col == second.col && first.row.checked_add(1) == Some(second.row);
        let adjacent = beside || above;
        adjacent.then_some(Self { first, second })
    }

    pub fn first(&self) -> Position {
        self.first
    }

    pub fn second(&self) -> Position {
        self.second
    }

    pub fn is_standing(&self) -> bool {
        self.first == self.second
    }

    /// Lying along a row (both cells share a row).
    fn is_lying_in_row(&self) -> bool {
        !self.is_standing() && self.first.row == self.second.row
    }

    fn shift_rows(self, d1: i32, d2: i32) -> Option<Self> {
        Some(Self {
            first: self.first.delta_row(d1)?,
            second: self.second.delta_row(d2)?,
        })
    }

    fn shift_cols(self, d1: i32, d2: i32) -> Option<Self> {
        Some(Self {
            first: self.first.delta_col(d1)?,
            second: self.second.delta_col(d2)?,
        })
    }

    /// The block after tilting it once in `mv`'s direction, or `None` if a
    /// cell would leave the `i32` coordinate range.
    pub fn tilt(self, mv: Move) -> Option<Self> {
        match mv {
            Move::Left => {
                if self.is_standing() {
                    self.shift_cols(-2, -1)
                } else if self.is_lying_in_row() {
                    self.shift_cols(-1, -2)
                } else {
                    self.shift_cols(-1, -1)
                }
            }
            Move::Right => {
                if self.is_standing() {
                    self.shift_cols(1, 2)
                } else if self.is_lying_in_row() {
                    self.shift_cols(2, 1)
                } else {
                    self.shift_cols(1, 1)
                }
            }
            Move::Up => {
                if self.is_standing() {
                    self.shift_rows(-2, -1)
                } else if self.is_lying_in_row() {
                    self.shift_rows(-1, -1)
                } else {
                    self.shift_rows(-1, -2)
                }
            }
            Move::Down => {
                if self.is_standing() {
                    self.shift_rows(1, 2)
                } else if self.is_lying_in_row() {
                    self.shift_rows(1, 1)
                } else {
                    self.shift_rows(2, 1)
                }
            }
        }
    }

    /// Both cells rest on the terrain.
    pub fn is_legal(&self, terrain: &Terrain) -> bool {
        terrain.contains(self.first) && terrain.contains(self.second)
    }

    /// Every representable tilt of this block, on the terrain or not.
    pub fn neighbors(self) -> impl Iterator<Item = (Block, Move)> {
        Move::ALL
            .into_iter()
            .filter_map(move |mv| self.tilt(mv).map(|block| (block, mv)))
    }

    /// The tilts that keep the block on the terrain.
    pub fn legal_neighbors(self, terrain: &Terrain) -> SmallVec<[(Block, Move); 4]> {
        self.neighbors()
            .filter(|(block, _)| block.is_legal(terrain))
            .collect()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_standing() {
            write!(f, "standing at {}", self.first)
        } else {
            write!(f, "lying on {} {}", self.first, self.second)
        }
    }
}

/// The set of cells a block may rest on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terrain {
    /// Row-major passability. Rows may differ in length; anything outside a
    /// row is off the terrain.
    Grid(Vec<Vec<bool>>),
    /// Every position is passable.
    Unbounded,
}

impl Terrain {
    pub fn grid(cells: Vec<Vec<bool>>) -> Self {
        Terrain::Grid(cells)
    }

    pub fn unbounded() -> Self {
        Terrain::Unbounded
    }

    pub fn contains(&self, pos: Position) -> bool {
        match self {
            Terrain::Unbounded => true,
            Terrain::Grid(cells) => {
                if pos.row < 0 || pos.col < 0 {
                    return false;
                }
                cells
                    .get(pos.row as usize)
                    .and_then(|row| row.get(pos.col as usize))
                    .copied()
                    .unwrap_or(false)
            }
        }
    }

    /// Number of passable cells, `None` for an unbounded terrain.
    pub fn passable_cells(&self) -> Option<usize> {
        match self {
            Terrain::Unbounded => None,
            Terrain::Grid(cells) => Some(cells.iter().flatten().filter(|&&c| c).count()),
        }
    }
}

/// On-disk JSON form of a level
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelFile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub rows: Vec<String>,
}

/// A terrain with a start cell and a goal cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub id: Option<String>,
    pub title: Option<String>,
    pub terrain: Terrain,
    pub start: Position,
    pub goal: Position,
}

impl Level {
    pub fn new(terrain: Terrain, start: Position, goal: Position) -> Self {
        Self {
            id: None,
            title: None,
            terrain,
            start,
            goal,
        }
    }

    /// Parse the text grid format.
    pub fn parse(text: &str) -> Result<Self> {
        let rows: Vec<&str> = text.lines().map(str::trim_end).collect();
        let first = rows.iter().position(|r| !r.is_empty());
        let last = rows.iter().rposition(|r| !r.is_empty());
        match (first, last) {
            (Some(first), Some(last)) => Self::from_rows(&rows[first..=last]),
            _ => Err(LevelError::Empty),
        }
    }

    /// Parse the JSON wrapper format.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: LevelFile = serde_json::from_str(json)?;
        let mut level = Self::from_rows(&file.rows)?;
        level.id = file.id;
        level.title = file.title;
        Ok(level)
    }

    /// Parse either format, picking JSON when the input is an object.
    pub fn from_source(source: &str) -> Result<Self> {
        if source.trim_start().starts_with('{') {
            Self::from_json(source)
        } else {
            Self::parse(source)
        }
    }

    /// Read a level file; `.json` files use the JSON format.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&contents)
        } else {
            Self::parse(&contents)
        }
    }

    fn from_rows<R: AsRef<str>>(rows: &[R]) -> Result<Self> {
        if rows.is_empty() {
            return Err(LevelError::Empty);
        }

        let mut cells = Vec::with_capacity(rows.len());
        let mut start: Option<Position> = None;
        let mut goal: Option<Position> = None;

        for (r, line) in rows.iter().enumerate() {
            let mut row = Vec::new();
            for (c, tile) in line.as_ref().chars().enumerate() {
                let pos = Position::new(r as i32, c as i32);
                let passable = match tile {
                    '-' => false,
                    'o' => true,
                    'S' => {
                        mark(&mut start, 'S', pos)?;
                        true
                    }
                    'T' => {
                        mark(&mut goal, 'T', pos)?;
                        true
                    }
                    _ => {
                        return Err(LevelError::UnknownTile {
                            row: r,
                            col: c,
                            tile,
                        })
                    }
                };
                row.push(passable);
            }
            cells.push(row);
        }

        Ok(Self::new(
            Terrain::grid(cells),
            start.ok_or(LevelError::Missing('S'))?,
            goal.ok_or(LevelError::Missing('T'))?,
        ))
    }
}

fn mark(slot: &mut Option<Position>, marker: char, pos: Position) -> Result<()> {
    if let Some(first) = *slot {
        return Err(LevelError::Duplicate {
            marker,
            first,
            second: pos,
        });
    }
    *slot = Some(pos);
    Ok(())
}

impl Puzzle for Level {
    type State = Block;
    type Move = Move;
    type Neighbors = SmallVec<[(Block, Move); 4]>;

    fn start(&self) -> Block {
        Block::standing(self.start)
    }

    fn is_goal(&self, block: &Block) -> bool {
        block.is_standing() && block.first() == self.goal
    }

    fn legal_neighbors(&self, block: &Block) -> Self::Neighbors {
        block.legal_neighbors(&self.terrain)
    }
}
