use rand::Rng;
use serde::{Deserialize, Serialize};

use super::value::TileValue;

/// Side length of the square grid.
pub const GRID_SIDE: usize = 4;
/// Total number of cells.
pub const CELL_COUNT: usize = GRID_SIDE * GRID_SIDE;

/// A direction to slide/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// All four directions, in a fixed order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

/// A cell coordinate, both components in `[0, GRID_SIDE)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    #[inline]
    pub fn new(x: usize, y: usize) -> Position {
        Position { x, y }
    }
}

/// Stable handle naming one tile instance for its lifetime on the board.
///
/// Identifiers are minted from a monotonically increasing counter and never
/// recycled. The value a tile displays is looked up externally by identifier,
/// so a tile keeps its identity across moves and a presentation layer can
/// track its visual continuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(u32);

impl TileId {
    #[inline]
    pub fn new(raw: u32) -> TileId {
        TileId(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// The 4x4 position map: each cell holds a tile identifier or nothing.
///
/// The board knows nothing about tile values; operations that need them
/// (`has_available_moves`, `to_values`) take a lookup from identifier to
/// value. Cloning yields an independent deep copy, and equality is slot-wise
/// identifier equality, which is how a caller detects that a slide changed
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    cells: [Option<TileId>; CELL_COUNT],
}

impl Board {
    /// An all-empty board.
    pub fn new() -> Board {
        Board::default()
    }

    #[inline]
    fn index(x: usize, y: usize) -> usize {
        assert!(
            x < GRID_SIDE && y < GRID_SIDE,
            "cell ({x},{y}) out of range"
        );
        y * GRID_SIDE + x
    }

    /// The identifier at `(x, y)`, if the cell is occupied.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<TileId> {
        self.cells[Self::index(x, y)]
    }

    /// Put `id` at `(x, y)`, replacing whatever the cell held.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, id: Option<TileId>) {
        self.cells[Self::index(x, y)] = id;
    }

    /// Scan one row/column from the edge tiles slide toward and return the
    /// first occupied cell, or `None` when the line is empty.
    ///
    /// For `Left` the scan runs x = 0 upward (tiles nearer x = 0 are already
    /// at the front and are consumed first), for `Right` x = 3 downward, and
    /// likewise top-down/bottom-up for the vertical directions. Move
    /// computation calls this repeatedly to pull tiles toward the destination
    /// edge, so the scan order is what makes results reproducible.
    pub fn first_occupied(&self, direction: Direction, line: usize) -> Option<Position> {
        (0..GRID_SIDE)
            .map(|step| line_position(direction, line, step))
            .find(|p| self.get(p.x, p.y).is_some())
    }

    /// All currently empty cells, row-major.
    pub fn free_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(i, _)| Position::new(i % GRID_SIDE, i / GRID_SIDE))
    }

    /// Uniformly pick one empty cell, `None` when the board is full.
    pub fn random_free_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        let free: Vec<Position> = self.free_positions().collect();
        if free.is_empty() {
            None
        } else {
            Some(free[rng.gen_range(0..free.len())])
        }
    }

    /// True while the player can still do something: an empty cell exists or
    /// two orthogonal neighbors hold equal values. Both axes are checked.
    pub fn has_available_moves<F>(&self, value_of: F) -> bool
    where
        F: Fn(TileId) -> TileValue,
    {
        if self.cells.iter().any(|cell| cell.is_none()) {
            return true;
        }
        for y in 0..GRID_SIDE {
            for x in 0..GRID_SIDE {
                let value = value_of(self.get(x, y).expect("board is full here"));
                if x + 1 < GRID_SIDE
                    && value_of(self.get(x + 1, y).expect("board is full here")) == value
                {
                    return true;
                }
                if y + 1 < GRID_SIDE
                    && value_of(self.get(x, y + 1).expect("board is full here")) == value
                {
                    return true;
                }
            }
        }
        false
    }

    /// All live identifiers, row-major. Restore paths iterate this to retire
    /// the tiles about to leave the board.
    pub fn tile_ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.cells.iter().flatten().copied()
    }

    /// Row-major value snapshot for persistence, via the external lookup.
    pub fn to_values<F>(&self, value_of: F) -> [Option<TileValue>; CELL_COUNT]
    where
        F: Fn(TileId) -> TileValue,
    {
        let mut values = [None; CELL_COUNT];
        for (slot, cell) in values.iter_mut().zip(self.cells.iter()) {
            *slot = cell.map(&value_of);
        }
        values
    }
}

/// The `step`-th cell of `line`, counted from the edge `direction` slides
/// toward. Shared by the occupancy scan above and the destination cursor in
/// `ops`, so both always agree on line geometry.
pub(crate) fn line_position(direction: Direction, line: usize, step: usize) -> Position {
    let along = match direction {
        Direction::Left | Direction::Up => step,
        Direction::Right | Direction::Down => GRID_SIDE - 1 - step,
    };
    match direction {
        Direction::Left | Direction::Right => Position::new(along, line),
        Direction::Up | Direction::Down => Position::new(line, along),
    }
}
