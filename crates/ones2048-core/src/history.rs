//! Bounded undo log with a persisted text encoding.
//!
//! Snapshots are value-only: identifiers are deliberately absent, since undo
//! rebuilds the board from values with freshly minted identifiers. The log
//! reserializes itself after every mutation and hands the string to a
//! persistence callback; where the string goes is the caller's business.

use std::fmt;

use log::warn;

use crate::engine::{TileValue, CELL_COUNT};

/// Maximum number of snapshots retained; adding past this evicts the oldest.
pub const RETAINED_ENTRIES: usize = 64;

/// Field value marking an empty cell in the persisted encoding.
const EMPTY_FIELD: i32 = -1;

/// A value-only capture of the 16 cells plus the score at that point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    cells: [Option<TileValue>; CELL_COUNT],
    score: u32,
}

impl HistoryEntry {
    pub fn new(cells: [Option<TileValue>; CELL_COUNT], score: u32) -> HistoryEntry {
        HistoryEntry { cells, score }
    }

    /// Row-major cell values, `None` for empty.
    pub fn cells(&self) -> &[Option<TileValue>; CELL_COUNT] {
        &self.cells
    }

    pub fn score(&self) -> u32 {
        self.score
    }
}

/// Ordered log of snapshots, oldest first, capped at [`RETAINED_ENTRIES`].
///
/// Construction takes an optional previously persisted string; anything
/// malformed degrades to an empty log so a corrupt save never blocks startup.
///
/// ```
/// use ones2048_core::History;
/// let log = History::new(None, |_| {});
/// assert!(log.is_empty());
/// ```
pub struct History {
    entries: Vec<HistoryEntry>,
    on_change: Box<dyn FnMut(&str)>,
}

impl History {
    /// Rehydrate from `persisted` (absent or malformed means empty) and hook
    /// up the persistence callback used by every later mutation.
    pub fn new(persisted: Option<&str>, on_change: impl FnMut(&str) + 'static) -> History {
        let entries = match persisted {
            None => Vec::new(),
            Some(raw) => match parse_log(raw) {
                Some(entries) => entries,
                None => {
                    warn!("discarding malformed history save ({} bytes)", raw.len());
                    Vec::new()
                }
            },
        };
        History {
            entries,
            on_change: Box::new(on_change),
        }
    }

    /// Append a snapshot, evicting the oldest entry past the cap.
    pub fn add(&mut self, cells: [Option<TileValue>; CELL_COUNT], score: u32) {
        self.entries.push(HistoryEntry::new(cells, score));
        if self.entries.len() > RETAINED_ENTRIES {
            self.entries.remove(0);
        }
        self.emit();
    }

    /// Drop the current snapshot and return the one before it.
    ///
    /// The log never shrinks below one entry: at the floor the sole entry is
    /// returned as-is and nothing is persisted, so repeated undo is stable.
    pub fn undo(&mut self) -> HistoryEntry {
        if self.entries.len() > 1 {
            self.entries.pop();
            self.emit();
        }
        self.current_element().clone()
    }

    /// The latest snapshot. Panics on an empty log; check [`History::is_empty`]
    /// first.
    pub fn current_element(&self) -> &HistoryEntry {
        self.entries.last().expect("history log is empty")
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Empty the log and persist the empty encoding.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.emit();
    }

    /// The persisted text form: entries joined by `';'`, oldest first; each
    /// entry is 16 cell fields (the rank, or -1 for empty) and the score,
    /// comma separated.
    pub fn serialize(&self) -> String {
        self.entries
            .iter()
            .map(entry_to_string)
            .collect::<Vec<_>>()
            .join(";")
    }

    fn emit(&mut self) {
        let encoded = self.serialize();
        (self.on_change)(&encoded);
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

fn entry_to_string(entry: &HistoryEntry) -> String {
    let mut fields: Vec<String> = entry
        .cells
        .iter()
        .map(|cell| cell.map_or(EMPTY_FIELD, |v| i32::from(v.rank())).to_string())
        .collect();
    fields.push(entry.score.to_string());
    fields.join(",")
}

/// Parse a whole persisted log. `None` means malformed; the empty string is
/// the valid encoding of an empty log.
fn parse_log(raw: &str) -> Option<Vec<HistoryEntry>> {
    if raw.is_empty() {
        return Some(Vec::new());
    }
    raw.split(';').map(parse_entry).collect()
}

fn parse_entry(raw: &str) -> Option<HistoryEntry> {
    let fields: Vec<&str> = raw.split(',').collect();
    if fields.len() != CELL_COUNT + 1 {
        return None;
    }
    let mut cells = [None; CELL_COUNT];
    for (slot, field) in cells.iter_mut().zip(&fields) {
        let rank: i32 = field.parse().ok()?;
        *slot = match rank {
            EMPTY_FIELD => None,
            0.. => Some(TileValue::from_rank(u8::try_from(rank).ok()?)?),
            _ => return None,
        };
    }
    let score: u32 = fields[CELL_COUNT].parse().ok()?;
    Some(HistoryEntry::new(cells, score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorded() -> (Rc<RefCell<Vec<String>>>, History) {
        let saves = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&saves);
        let history = History::new(None, move |raw: &str| sink.borrow_mut().push(raw.to_string()));
        (saves, history)
    }

    fn snapshot(ranks: &[(usize, u8)]) -> [Option<TileValue>; CELL_COUNT] {
        let mut cells = [None; CELL_COUNT];
        for &(i, rank) in ranks {
            cells[i] = Some(TileValue::from_rank(rank).unwrap());
        }
        cells
    }

    #[test]
    fn serialization_round_trips() {
        let (_, mut history) = recorded();
        history.add(snapshot(&[(0, 0), (5, 3), (15, 16)]), 0);
        history.add(snapshot(&[(0, 1), (5, 3)]), 42);

        let encoded = history.serialize();
        let reparsed = History::new(Some(&encoded), |_| {});
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed.serialize(), encoded);
        assert_eq!(reparsed.current_element(), history.current_element());
    }

    #[test]
    fn encoding_is_explicit() {
        let (_, mut history) = recorded();
        history.add(snapshot(&[(0, 1), (1, 1)]), 4);
        assert_eq!(
            history.serialize(),
            "1,1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,4"
        );
    }

    #[test]
    fn absent_or_empty_input_means_empty_log() {
        assert!(History::new(None, |_| {}).is_empty());
        assert!(History::new(Some(""), |_| {}).is_empty());
    }

    #[test]
    fn malformed_input_means_empty_log() {
        for bad in [
            "garbage",
            "1,2,3",
            "1,1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1",
            "1,1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,99,4",
            "1,1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-2,4",
            "1,1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,4;oops",
        ] {
            let history = History::new(Some(bad), |_| {});
            assert!(history.is_empty(), "accepted malformed input {bad:?}");
        }
    }

    #[test]
    fn undo_never_drops_below_one_entry() {
        let (_, mut history) = recorded();
        history.add(snapshot(&[(0, 0)]), 0);
        history.add(snapshot(&[(0, 0), (1, 0)]), 0);
        history.add(snapshot(&[(0, 1), (2, 0)]), 4);

        assert_eq!(history.undo().score(), 0);
        assert_eq!(history.len(), 2);
        let floor = history.undo();
        assert_eq!(history.len(), 1);

        // Stable at the floor.
        assert_eq!(history.undo(), floor);
        assert_eq!(history.undo(), floor);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn adding_past_the_cap_evicts_the_oldest() {
        let (_, mut history) = recorded();
        for score in 0..(RETAINED_ENTRIES as u32 + 5) {
            history.add(snapshot(&[(0, 0)]), score);
        }
        assert_eq!(history.len(), RETAINED_ENTRIES);
        // The five oldest snapshots are gone.
        let oldest = History::new(Some(&history.serialize()), |_| {});
        assert_eq!(oldest.entries.first().unwrap().score(), 5);
    }

    #[test]
    fn every_mutation_persists_the_whole_log() {
        let (saves, mut history) = recorded();
        history.add(snapshot(&[(0, 0)]), 0);
        assert_eq!(saves.borrow().len(), 1);
        assert_eq!(saves.borrow().last().unwrap(), &history.serialize());

        history.add(snapshot(&[(0, 0), (1, 1)]), 2);
        assert_eq!(saves.borrow().len(), 2);

        history.undo();
        assert_eq!(saves.borrow().len(), 3);

        // Undo at the floor removes nothing and persists nothing.
        history.undo();
        assert_eq!(saves.borrow().len(), 3);

        history.clear();
        assert_eq!(saves.borrow().len(), 4);
        assert_eq!(saves.borrow().last().unwrap(), "");
    }
}
