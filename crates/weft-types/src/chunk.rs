use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// One side of a two-way comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

impl Side {
    /// The opposite side.
    pub fn other(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// A maximal run of equal elements: `a[a..a+len] == b[b..b+len]`.
///
/// A block list is strictly increasing in both starts and always ends with
/// the zero-length sentinel `(len_a, len_b, 0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchBlock {
    pub a: usize,
    pub b: usize,
    pub len: usize,
}

impl MatchBlock {
    pub fn new(a: usize, b: usize, len: usize) -> Self {
        Self { a, b, len }
    }

    /// The end-of-sequence sentinel.
    pub fn sentinel(len_a: usize, len_b: usize) -> Self {
        Self::new(len_a, len_b, 0)
    }

    pub fn is_sentinel(&self) -> bool {
        self.len == 0
    }
}

/// The kind of a [`Chunk`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

impl ChunkTag {
    /// The tag implied by the emptiness of a gap between two matches.
    ///
    /// Returns `None` when both ranges are empty (no gap).
    pub fn for_gap(a: &Range<usize>, b: &Range<usize>) -> Option<Self> {
        match (a.is_empty(), b.is_empty()) {
            (false, false) => Some(ChunkTag::Replace),
            (false, true) => Some(ChunkTag::Delete),
            (true, false) => Some(ChunkTag::Insert),
            (true, true) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkTag::Equal => "equal",
            ChunkTag::Replace => "replace",
            ChunkTag::Delete => "delete",
            ChunkTag::Insert => "insert",
        }
    }
}

/// A typed alignment unit between `a[self.a]` and `b[self.b]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chunk {
    pub tag: ChunkTag,
    pub a: Range<usize>,
    pub b: Range<usize>,
}

impl Chunk {
    pub fn new(tag: ChunkTag, a: Range<usize>, b: Range<usize>) -> Self {
        Self { tag, a, b }
    }

    /// Returns `true` for anything but `equal`.
    pub fn is_change(&self) -> bool {
        self.tag != ChunkTag::Equal
    }

    /// The range on the given side.
    pub fn range(&self, side: Side) -> &Range<usize> {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    /// A copy with both ranges moved by the given signed offsets.
    pub fn shifted(&self, delta_a: isize, delta_b: isize) -> Self {
        Self {
            tag: self.tag,
            a: shift_range(&self.a, delta_a),
            b: shift_range(&self.b, delta_b),
        }
    }

    /// A copy with the range on `side` moved by `delta`.
    pub fn shifted_on(&self, side: Side, delta: isize) -> Self {
        match side {
            Side::A => self.shifted(delta, 0),
            Side::B => self.shifted(0, delta),
        }
    }
}

/// Move a range by a signed offset.
pub fn shift_range(range: &Range<usize>, delta: isize) -> Range<usize> {
    range.start.saturating_add_signed(delta)..range.end.saturating_add_signed(delta)
}

/// An ordered chunk list partitioning `[0, len_a)` and `[0, len_b)`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkList {
    chunks: Vec<Chunk>,
    len_a: usize,
    len_b: usize,
    generation: u64,
}

impl ChunkList {
    /// Wrap chunks without checking them. See [`validate`](Self::validate).
    pub fn new(chunks: Vec<Chunk>, len_a: usize, len_b: usize) -> Self {
        Self {
            chunks,
            len_a,
            len_b,
            generation: 0,
        }
    }

    /// Tag the list with the generation that produced it.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len_a(&self) -> usize {
        self.len_a
    }

    pub fn len_b(&self) -> usize {
        self.len_b
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// The non-equal chunks.
    pub fn changes(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|c| c.is_change())
    }

    /// Number of non-equal chunks.
    pub fn change_count(&self) -> usize {
        self.changes().count()
    }

    /// Returns `true` if the two sides compare equal everywhere.
    pub fn is_identical(&self) -> bool {
        self.chunks.iter().all(|c| !c.is_change())
    }

    /// Check the partition and coalescing invariants.
    pub fn validate(&self) -> TypeResult<()> {
        let (mut pos_a, mut pos_b) = (0usize, 0usize);
        let mut prev: Option<ChunkTag> = None;

        for (i, chunk) in self.chunks.iter().enumerate() {
            if chunk.a.start != pos_a || chunk.b.start != pos_b {
                return Err(TypeError::Invariant(format!(
                    "chunk {i} starts at ({}, {}), expected ({pos_a}, {pos_b})",
                    chunk.a.start, chunk.b.start
                )));
            }
            if chunk.a.start > chunk.a.end || chunk.b.start > chunk.b.end {
                return Err(TypeError::Invariant(format!("chunk {i} has an inverted range")));
            }
            let shape_ok = match chunk.tag {
                ChunkTag::Equal => {
                    chunk.a.is_empty() == chunk.b.is_empty()
                        && (!chunk.a.is_empty() || self.chunks.len() == 1)
                }
                ChunkTag::Replace => !chunk.a.is_empty() && !chunk.b.is_empty(),
                ChunkTag::Delete => !chunk.a.is_empty() && chunk.b.is_empty(),
                ChunkTag::Insert => chunk.a.is_empty() && !chunk.b.is_empty(),
            };
            if !shape_ok {
                return Err(TypeError::Invariant(format!(
                    "chunk {i} ({}) has ranges {:?} / {:?}",
                    chunk.tag.as_str(),
                    chunk.a,
                    chunk.b
                )));
            }
            if prev == Some(chunk.tag) {
                return Err(TypeError::Invariant(format!(
                    "chunks {} and {i} share tag {}",
                    i - 1,
                    chunk.tag.as_str()
                )));
            }
            prev = Some(chunk.tag);
            pos_a = chunk.a.end;
            pos_b = chunk.b.end;
        }

        if pos_a != self.len_a || pos_b != self.len_b {
            return Err(TypeError::Invariant(format!(
                "chunks cover ({pos_a}, {pos_b}), sequences have ({}, {})",
                self.len_a, self.len_b
            )));
        }
        Ok(())
    }

    /// Rebuild `b` by applying the chunk operations to `a`.
    ///
    /// Equal chunks copy from `a`; insert and replace chunks copy from `b`;
    /// delete chunks copy nothing.
    pub fn apply<T: Clone>(&self, a: &[T], b: &[T]) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len_b);
        for chunk in &self.chunks {
            match chunk.tag {
                ChunkTag::Equal => out.extend_from_slice(&a[chunk.a.clone()]),
                ChunkTag::Insert | ChunkTag::Replace => {
                    out.extend_from_slice(&b[chunk.b.clone()])
                }
                ChunkTag::Delete => {}
            }
        }
        out
    }
}

impl<'a> IntoIterator for &'a ChunkList {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(tag: ChunkTag, a: Range<usize>, b: Range<usize>) -> Chunk {
        Chunk::new(tag, a, b)
    }

    #[test]
    fn gap_tags() {
        assert_eq!(ChunkTag::for_gap(&(0..1), &(0..2)), Some(ChunkTag::Replace));
        assert_eq!(ChunkTag::for_gap(&(0..1), &(3..3)), Some(ChunkTag::Delete));
        assert_eq!(ChunkTag::for_gap(&(2..2), &(0..2)), Some(ChunkTag::Insert));
        assert_eq!(ChunkTag::for_gap(&(2..2), &(1..1)), None);
    }

    #[test]
    fn valid_partition_passes() {
        let list = ChunkList::new(
            vec![
                chunk(ChunkTag::Equal, 0..2, 0..2),
                chunk(ChunkTag::Replace, 2..3, 2..4),
                chunk(ChunkTag::Equal, 3..4, 4..5),
                chunk(ChunkTag::Delete, 4..6, 5..5),
            ],
            6,
            5,
        );
        assert!(list.validate().is_ok());
        assert_eq!(list.change_count(), 2);
        assert!(!list.is_identical());
    }

    #[test]
    fn gap_is_rejected() {
        let list = ChunkList::new(
            vec![
                chunk(ChunkTag::Equal, 0..2, 0..2),
                chunk(ChunkTag::Insert, 3..3, 2..3),
            ],
            3,
            3,
        );
        assert!(matches!(list.validate(), Err(TypeError::Invariant(_))));
    }

    #[test]
    fn uncoalesced_neighbours_are_rejected() {
        let list = ChunkList::new(
            vec![
                chunk(ChunkTag::Equal, 0..1, 0..1),
                chunk(ChunkTag::Equal, 1..2, 1..2),
            ],
            2,
            2,
        );
        assert!(list.validate().is_err());
    }

    #[test]
    fn short_cover_is_rejected() {
        let list = ChunkList::new(vec![chunk(ChunkTag::Equal, 0..1, 0..1)], 2, 1);
        assert!(list.validate().is_err());
    }

    #[test]
    fn empty_equal_allowed_only_alone() {
        let alone = ChunkList::new(vec![chunk(ChunkTag::Equal, 0..0, 0..0)], 0, 0);
        assert!(alone.validate().is_ok());

        let mixed = ChunkList::new(
            vec![
                chunk(ChunkTag::Equal, 0..0, 0..0),
                chunk(ChunkTag::Insert, 0..0, 0..1),
            ],
            0,
            1,
        );
        assert!(mixed.validate().is_err());
    }

    #[test]
    fn apply_rebuilds_b() {
        let a = ["a", "b", "c", "d"];
        let b = ["a", "X", "Y", "c"];
        let list = ChunkList::new(
            vec![
                chunk(ChunkTag::Equal, 0..1, 0..1),
                chunk(ChunkTag::Replace, 1..2, 1..3),
                chunk(ChunkTag::Equal, 2..3, 3..4),
                chunk(ChunkTag::Delete, 3..4, 4..4),
            ],
            4,
            4,
        );
        assert_eq!(list.apply(&a, &b), b.to_vec());
    }

    #[test]
    fn shifting() {
        let c = chunk(ChunkTag::Replace, 4..6, 2..3);
        assert_eq!(c.shifted(-2, 3), chunk(ChunkTag::Replace, 2..4, 5..6));
        assert_eq!(c.shifted_on(Side::B, 1), chunk(ChunkTag::Replace, 4..6, 3..4));
        assert_eq!(c.range(Side::A), &(4..6));
        assert_eq!(Side::A.other(), Side::B);
    }

    #[test]
    fn serializes_tags_lowercase() {
        let json = serde_json::to_string(&ChunkTag::Replace).unwrap();
        assert_eq!(json, "\"replace\"");
    }
}
