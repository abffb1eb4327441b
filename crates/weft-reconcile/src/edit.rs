use std::ops::Range;

use serde::{Deserialize, Serialize};
use weft_types::Side;

/// A contiguous replacement in one live sequence: `removed` lines at
/// `start` were replaced by `inserted` lines.
///
/// `S` names the side; [`Side`] for pairs, [`MergeSide`](weft_types::MergeSide)
/// for merges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edit<S = Side> {
    pub side: S,
    pub start: usize,
    pub removed: usize,
    pub inserted: usize,
}

impl<S: Copy> Edit<S> {
    pub fn new(side: S, start: usize, removed: usize, inserted: usize) -> Self {
        Self {
            side,
            start,
            removed,
            inserted,
        }
    }

    /// Lines replaced, in the coordinates before the edit.
    pub fn old_range(&self) -> Range<usize> {
        self.start..self.start + self.removed
    }

    /// Lines inserted, in the coordinates after the edit.
    pub fn new_range(&self) -> Range<usize> {
        self.start..self.start + self.inserted
    }

    /// Change in sequence length.
    pub fn delta(&self) -> isize {
        self.inserted as isize - self.removed as isize
    }

    /// The same span on another side.
    pub fn on<T>(&self, side: T) -> Edit<T> {
        Edit {
            side,
            start: self.start,
            removed: self.removed,
            inserted: self.inserted,
        }
    }
}

/// Closed-interval overlap: ranges that merely touch count.
pub(crate) fn touches(range: &Range<usize>, span: &Range<usize>) -> bool {
    range.start <= span.end && span.start <= range.end
}
