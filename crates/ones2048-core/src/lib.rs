//! Core state engine for a 1-based 2048-style sliding-tile puzzle.
//!
//! - [`engine`] holds the 4x4 position map and the pure slide/merge
//!   computation over stable tile identifiers.
//! - [`history`] is the bounded undo log with its persisted text encoding.
//! - [`session`] ties board, tile values, score, and persistence together
//!   into one owned game aggregate.
//!
//! Rendering, animation, and input live outside this crate; the engine only
//! reports which identifiers moved or merged and where, so a presentation
//! layer can track each tile's visual continuity.

pub mod engine;
pub mod history;
pub mod session;

pub use engine::{
    compute_move, Board, Direction, MoveOutcome, Position, TileId, TileMerge, TileMove, TileValue,
};
pub use history::{History, HistoryEntry};
pub use session::{MoveReport, Session, SpawnedTile, Storage};
