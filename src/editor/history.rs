//! Bounded undo/redo history over snapshots of the field list.

use std::time::Instant;

use crate::model::field::Field;

/// Maximum retained undo states; older entries fall off the front.
pub const HISTORY_CAPACITY: usize = 50;

/// An immutable snapshot of the full field list at one point in time.
#[derive(Clone, Debug)]
pub struct HistoryState {
    /// Snapshot of every field.
    pub fields: Vec<Field>,
    /// When the snapshot was taken.
    pub at: Instant,
}

/// Bounded undo/redo stack with a cursor.
///
/// The entry at the cursor is the current state; undo/redo move the cursor
/// and are no-ops at either end. Pushing while the cursor is mid-stack
/// discards the redo tail.
#[derive(Debug)]
pub struct History {
    entries: Vec<HistoryState>,
    cursor: usize,
}

impl History {
    /// Start a history whose baseline is `initial`.
    pub fn new(initial: Vec<Field>) -> Self {
        Self {
            entries: vec![HistoryState {
                fields: initial,
                at: Instant::now(),
            }],
            cursor: 0,
        }
    }

    /// Record a new current state.
    pub fn push(&mut self, fields: Vec<Field>) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryState {
            fields,
            at: Instant::now(),
        });
        if self.entries.len() > HISTORY_CAPACITY {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back; `None` at the oldest retained state.
    pub fn undo(&mut self) -> Option<&[Field]> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor].fields)
    }

    /// Step forward; `None` at the newest state.
    pub fn redo(&mut self) -> Option<&[Field]> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.entries[self.cursor].fields)
    }

    /// Whether an undo step is available.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether a redo step is available.
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of retained states (including the baseline).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the baseline state is never evicted below one entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(n: usize) -> Vec<Field> {
        (0..n).map(|i| Field::text(format!("f{i}"))).collect()
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut h = History::new(fields(0));
        h.push(fields(1));
        h.push(fields(2));

        assert_eq!(h.undo().unwrap().len(), 1);
        assert_eq!(h.undo().unwrap().len(), 0);
        assert!(h.undo().is_none());

        assert_eq!(h.redo().unwrap().len(), 1);
        assert_eq!(h.redo().unwrap().len(), 2);
        assert!(h.redo().is_none());
    }

    #[test]
    fn push_discards_redo_tail() {
        let mut h = History::new(fields(0));
        h.push(fields(1));
        h.push(fields(2));
        h.undo();
        h.push(fields(3));

        assert!(!h.can_redo());
        assert_eq!(h.undo().unwrap().len(), 1);
    }

    #[test]
    fn capacity_is_bounded() {
        let mut h = History::new(fields(0));
        for i in 0..(HISTORY_CAPACITY * 2) {
            h.push(fields(i));
        }
        assert_eq!(h.len(), HISTORY_CAPACITY);
        // Cursor still points at the newest entry.
        assert!(!h.can_redo());
        assert!(h.can_undo());
    }
}
