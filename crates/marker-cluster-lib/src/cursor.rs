//! Cursor over located elements, newest first

use crate::{ElementKey, GeoPoint};

/// Index cursor over every element with a real location, in reverse registration order
#[derive(Debug, Clone, Default)]
pub struct SortedCursor {
    positions: Vec<ElementKey>,
    cursor: usize,
}

impl SortedCursor {
    /// Build from the registered element locations; `(0, 0)` entries are skipped
    pub fn new(locations: &[GeoPoint]) -> Self {
        let positions = locations
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, point)| !point.is_unknown())
            .map(|(index, _)| ElementKey(index))
            .collect();
        Self {
            positions,
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<ElementKey> {
        self.positions.get(self.cursor).copied()
    }

    pub fn has_next(&self) -> bool {
        self.cursor + 1 < self.positions.len()
    }

    pub fn has_prev(&self) -> bool {
        self.cursor > 0
    }

    /// Step forward. Returns false (and stays put) at the end.
    pub fn move_next(&mut self) -> bool {
        if self.has_next() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Step back. Returns false (and stays put) at the start.
    pub fn move_prev(&mut self) -> bool {
        if self.has_prev() {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to `cursor`. Out-of-range positions are rejected.
    pub fn set(&mut self, cursor: usize) -> bool {
        if cursor < self.positions.len() {
            self.cursor = cursor;
            true
        } else {
            false
        }
    }
}
