//! Pure move computation over the position map.

use super::state::{line_position, Board, Direction, Position, TileId, GRID_SIDE};
use super::value::TileValue;

/// One tile sliding to a new cell, keeping its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMove {
    pub id: TileId,
    pub to: Position,
}

/// Two equal tiles collapsing onto one cell.
///
/// `id` is the surviving identifier (the tile that was already moving) and
/// `consumed` its partner. The engine only reports the pair; promoting the
/// survivor to the next rank is the caller's commit step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMerge {
    pub id: TileId,
    pub consumed: TileId,
    pub to: Position,
}

/// Result of computing one slide: the new board plus the records needed to
/// animate the transition. The input board is left untouched so the caller
/// can diff old against new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub board: Board,
    pub moves: Vec<TileMove>,
    pub merges: Vec<TileMerge>,
}

impl MoveOutcome {
    /// True when the slide moved or merged anything relative to `before`.
    pub fn changed(&self, before: &Board) -> bool {
        self.board != *before
    }
}

/// Slide every line of `board` toward `direction`'s edge, merging adjacent
/// equal pairs once each.
///
/// Per line, tiles are pulled one at a time in scan order toward a
/// destination cursor that starts at the target edge and backs off one cell
/// per placement, so tiles never jump over already-placed ones. When the
/// pulled tile and the next one in line hold equal values they fuse onto the
/// cursor cell and both source tiles are consumed; otherwise the pulled tile
/// lands alone. Every occupied input cell ends up in exactly one move or
/// merge record, and the scan order is fixed per direction, so equal inputs
/// always produce equal outcomes.
pub fn compute_move<F>(board: &Board, direction: Direction, value_of: F) -> MoveOutcome
where
    F: Fn(TileId) -> TileValue,
{
    let mut working = board.clone();
    let mut next_board = Board::new();
    let mut moves = Vec::new();
    let mut merges = Vec::new();

    for line in 0..GRID_SIDE {
        let mut placed = 0;
        while let Some(pos) = working.first_occupied(direction, line) {
            let id = working
                .get(pos.x, pos.y)
                .expect("scan returned an occupied cell");
            working.set(pos.x, pos.y, None);
            let dest = line_position(direction, line, placed);
            placed += 1;

            let partner = working.first_occupied(direction, line).map(|next| {
                let partner_id = working
                    .get(next.x, next.y)
                    .expect("scan returned an occupied cell");
                (next, partner_id)
            });
            match partner {
                Some((next, partner_id)) if value_of(partner_id) == value_of(id) => {
                    working.set(next.x, next.y, None);
                    next_board.set(dest.x, dest.y, Some(id));
                    merges.push(TileMerge {
                        id,
                        consumed: partner_id,
                        to: dest,
                    });
                }
                _ => {
                    next_board.set(dest.x, dest.y, Some(id));
                    moves.push(TileMove { id, to: dest });
                }
            }
        }
    }

    MoveOutcome {
        board: next_board,
        moves,
        merges,
    }
}
