//! Two-way line diffs.

use std::hash::Hash;

use tracing::{debug, trace, warn};
use weft_types::{CancelToken, Chunk, ChunkList, ChunkTag, DiffOptions, MatchLimits, Sequence};

use crate::chunks::{build_chunks, coalesce, coarse_chunks};
use crate::error::{DiffError, DiffResult};
use crate::matcher::{Budget, SequenceMatcher};
use crate::normalize::{Interner, LineNormalizer};

/// A reusable line differ for one set of [`DiffOptions`].
///
/// Compiling the text filters is the only fallible step, so it happens once
/// here rather than on every comparison.
#[derive(Clone, Debug)]
pub struct TextDiffer {
    normalizer: LineNormalizer,
    autojunk: bool,
    limits: MatchLimits,
}

impl TextDiffer {
    pub fn new(opts: &DiffOptions) -> DiffResult<Self> {
        Ok(Self {
            normalizer: LineNormalizer::new(opts)?,
            autojunk: opts.autojunk,
            limits: opts.limits.clone(),
        })
    }

    pub fn normalizer(&self) -> &LineNormalizer {
        &self.normalizer
    }

    /// Diff two line slices.
    ///
    /// Running out of budget yields a single coarse chunk rather than an
    /// error.
    pub fn diff(&self, a: &[String], b: &[String]) -> ChunkList {
        match self.run(a, b, None) {
            Ok(list) => list,
            // Only cancellation escapes `run`, and there is no token here.
            Err(_) => coarse_chunks(a.len(), b.len()),
        }
    }

    /// Diff two line slices, stopping early with [`DiffError::Cancelled`]
    /// once `cancel` is set.
    pub fn diff_cancellable(
        &self,
        a: &[String],
        b: &[String],
        cancel: &CancelToken,
    ) -> DiffResult<ChunkList> {
        self.run(a, b, Some(cancel))
    }

    /// Returns `true` if the two slices compare equal under these options.
    pub fn lines_equal(&self, a: &[String], b: &[String]) -> bool {
        self.normalizer.lines_equal(a, b)
    }

    fn run(&self, a: &[String], b: &[String], cancel: Option<&CancelToken>) -> DiffResult<ChunkList> {
        if a == b {
            trace!(len = a.len(), "sides identical");
            return Ok(identical(a.len()));
        }

        let left = self.normalizer.prepare(a);
        let right = self.normalizer.prepare(b);
        let mut interner = Interner::default();
        let ids_a = interner.intern_all(left.keys);
        let ids_b = interner.intern_all(right.keys);

        let mut budget = Budget::new(&self.limits, cancel);
        let matcher = SequenceMatcher::new(&ids_a, &ids_b, self.autojunk);
        let blocks = match matcher.matching_blocks(&mut budget) {
            Ok(blocks) => blocks,
            Err(DiffError::ResourceExhausted { steps }) => {
                warn!(
                    steps,
                    len_a = a.len(),
                    len_b = b.len(),
                    "match budget exhausted, falling back to a coarse diff"
                );
                return Ok(coarse_chunks(a.len(), b.len()));
            }
            Err(e) => return Err(e),
        };

        let filtered = build_chunks(&blocks, ids_a.len(), ids_b.len());
        let list = if left.map.is_some() || right.map.is_some() {
            remap(
                &filtered,
                left.map.as_deref(),
                a.len(),
                right.map.as_deref(),
                b.len(),
            )
        } else {
            filtered
        };

        debug!(
            len_a = a.len(),
            len_b = b.len(),
            distinct = interner.len(),
            popular = matcher.popular_count(),
            steps = budget.steps(),
            chunks = list.len(),
            changes = list.change_count(),
            "pair diff computed"
        );
        Ok(list)
    }
}

/// A single equal chunk over two identical sides.
fn identical(len: usize) -> ChunkList {
    ChunkList::new(vec![Chunk::new(ChunkTag::Equal, 0..len, 0..len)], len, len)
}

/// Diff two sequences under `opts`.
///
/// Fails only when a text filter does not compile.
pub fn diff_pair(a: &Sequence, b: &Sequence, opts: &DiffOptions) -> DiffResult<ChunkList> {
    Ok(TextDiffer::new(opts)?.diff(a.lines(), b.lines()))
}

/// Diff two slices of arbitrary hashable records with no normalisation and
/// no work limit.
pub fn diff_records<T: Hash + Eq>(a: &[T], b: &[T], autojunk: bool) -> ChunkList {
    let matcher = SequenceMatcher::new(a, b, autojunk);
    match matcher.matching_blocks(&mut Budget::unbounded()) {
        Ok(blocks) => build_chunks(&blocks, a.len(), b.len()),
        Err(_) => coarse_chunks(a.len(), b.len()),
    }
}

/// Map a chunk list over blank-filtered keys back onto the original lines.
///
/// Dropped lines join the chunk that precedes them; leading ones join the
/// first chunk.
fn remap(
    filtered: &ChunkList,
    map_a: Option<&[usize]>,
    len_a: usize,
    map_b: Option<&[usize]>,
    len_b: usize,
) -> ChunkList {
    let bound = |map: Option<&[usize]>, k: usize, len: usize| match map {
        Some(map) => map.get(k).copied().unwrap_or(len),
        None => k,
    };

    let last = filtered.len().saturating_sub(1);
    let mapped = filtered.iter().enumerate().map(|(i, chunk)| {
        let (a_lo, b_lo) = if i == 0 {
            (0, 0)
        } else {
            (bound(map_a, chunk.a.start, len_a), bound(map_b, chunk.b.start, len_b))
        };
        let (a_hi, b_hi) = if i == last {
            (len_a, len_b)
        } else {
            (bound(map_a, chunk.a.end, len_a), bound(map_b, chunk.b.end, len_b))
        };
        let (a, b) = (a_lo..a_hi, b_lo..b_hi);

        // Equal chunks may differ in length here; only a one-sided equal
        // chunk has to become a change.
        let tag = match chunk.tag {
            ChunkTag::Equal if a.is_empty() == b.is_empty() => ChunkTag::Equal,
            _ => ChunkTag::for_gap(&a, &b).unwrap_or(ChunkTag::Equal),
        };
        Chunk::new(tag, a, b)
    });

    let mut chunks = coalesce(mapped);
    if chunks.is_empty() {
        chunks.push(Chunk::new(ChunkTag::Equal, 0..0, 0..0));
    }
    ChunkList::new(chunks, len_a, len_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use weft_types::WhitespaceMode;

    fn seq(items: &[&str]) -> Sequence {
        Sequence::from(items.to_vec())
    }

    fn tags(list: &ChunkList) -> Vec<(&'static str, usize, usize, usize, usize)> {
        list.iter()
            .map(|c| (c.tag.as_str(), c.a.start, c.a.end, c.b.start, c.b.end))
            .collect()
    }

    #[test]
    fn simple_replace() {
        let list = diff_pair(
            &seq(&["a", "b", "c"]),
            &seq(&["a", "x", "c"]),
            &DiffOptions::default(),
        )
        .unwrap();
        assert_eq!(
            tags(&list),
            vec![
                ("equal", 0, 1, 0, 1),
                ("replace", 1, 2, 1, 2),
                ("equal", 2, 3, 2, 3),
            ]
        );
    }

    #[test]
    fn insertion_into_empty() {
        let list = diff_pair(&seq(&[]), &seq(&["a", "b"]), &DiffOptions::default()).unwrap();
        assert_eq!(tags(&list), vec![("insert", 0, 0, 0, 2)]);
    }

    #[test]
    fn both_empty() {
        let list = diff_pair(&seq(&[]), &seq(&[]), &DiffOptions::default()).unwrap();
        assert_eq!(tags(&list), vec![("equal", 0, 0, 0, 0)]);
    }

    #[test]
    fn identical_is_single_equal() {
        let s = seq(&["x", "y", "z"]);
        let list = diff_pair(&s, &s, &DiffOptions::default()).unwrap();
        assert_eq!(tags(&list), vec![("equal", 0, 3, 0, 3)]);
        assert!(list.is_identical());
    }

    #[test]
    fn whitespace_insensitive() {
        let opts = DiffOptions {
            ignore_whitespace: WhitespaceMode::All,
            ..Default::default()
        };
        let list = diff_pair(&seq(&["a b", "c"]), &seq(&["ab", " c "]), &opts).unwrap();
        assert!(list.is_identical());
    }

    #[test]
    fn blank_lines_fold_into_neighbours() {
        let opts = DiffOptions {
            ignore_blank_lines: true,
            ..Default::default()
        };
        let a = seq(&["a", "", "b", "c"]);
        let b = seq(&["a", "b", "", "", "x"]);
        let list = diff_pair(&a, &b, &opts).unwrap();
        assert_eq!(
            tags(&list),
            vec![("equal", 0, 3, 0, 4), ("replace", 3, 4, 4, 5)]
        );
        assert_eq!(list.len_a(), 4);
        assert_eq!(list.len_b(), 5);
    }

    #[test]
    fn blank_only_difference_is_identical() {
        let opts = DiffOptions {
            ignore_blank_lines: true,
            ..Default::default()
        };
        let list = diff_pair(&seq(&["a", "", "b"]), &seq(&["a", "b", ""]), &opts).unwrap();
        assert!(list.is_identical());
    }

    #[test]
    fn leading_blank_joins_first_chunk() {
        let opts = DiffOptions {
            ignore_blank_lines: true,
            ..Default::default()
        };
        let list = diff_pair(&seq(&["", "x"]), &seq(&["y", "x"]), &opts).unwrap();
        assert_eq!(
            tags(&list),
            vec![("replace", 0, 1, 0, 1), ("equal", 1, 2, 1, 2)]
        );
    }

    #[test]
    fn all_blank_against_empty_is_a_delete() {
        let opts = DiffOptions {
            ignore_blank_lines: true,
            ..Default::default()
        };
        let list = diff_pair(&seq(&["", " "]), &seq(&[]), &opts).unwrap();
        assert_eq!(tags(&list), vec![("delete", 0, 2, 0, 0)]);
    }

    #[test]
    fn exhausted_budget_degrades_to_coarse_chunk() {
        let opts = DiffOptions {
            limits: MatchLimits {
                max_steps: Some(1),
                timeout_ms: None,
            },
            ..Default::default()
        };
        let a = seq(&["a", "b", "c", "d"]);
        let b = seq(&["a", "x", "c", "y"]);
        let list = diff_pair(&a, &b, &opts).unwrap();
        assert_eq!(tags(&list), vec![("replace", 0, 4, 0, 4)]);
    }

    #[test]
    fn cancelled_diff_reports_cancellation() {
        let differ = TextDiffer::new(&DiffOptions::default()).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let a = seq(&["a", "b"]);
        let b = seq(&["b", "a"]);
        let err = differ.diff_cancellable(a.lines(), b.lines(), &token).unwrap_err();
        assert_eq!(err, DiffError::Cancelled);
    }

    #[test]
    fn records_diff() {
        let list = diff_records(&[1u64, 2, 3], &[1u64, 3], false);
        assert_eq!(
            tags(&list),
            vec![("equal", 0, 1, 0, 1), ("delete", 1, 2, 1, 1), ("equal", 2, 3, 1, 2)]
        );
    }

    fn small_lines() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "", " "]), 0..24)
            .prop_map(|v| v.into_iter().map(String::from).collect())
    }

    proptest! {
        #[test]
        fn chunks_partition_and_apply(a in small_lines(), b in small_lines()) {
            let differ = TextDiffer::new(&DiffOptions::default()).unwrap();
            let list = differ.diff(&a, &b);
            prop_assert!(list.validate().is_ok());
            prop_assert_eq!(list.apply(&a, &b), b.clone());
        }

        #[test]
        fn filtered_chunks_still_partition(a in small_lines(), b in small_lines()) {
            let differ = TextDiffer::new(&DiffOptions {
                ignore_blank_lines: true,
                ignore_whitespace: WhitespaceMode::All,
                ..Default::default()
            }).unwrap();
            let list = differ.diff(&a, &b);
            prop_assert_eq!(list.len_a(), a.len());
            prop_assert_eq!(list.len_b(), b.len());
            let (mut pa, mut pb) = (0, 0);
            for chunk in &list {
                prop_assert_eq!(chunk.a.start, pa);
                prop_assert_eq!(chunk.b.start, pb);
                pa = chunk.a.end;
                pb = chunk.b.end;
            }
            prop_assert_eq!((pa, pb), (a.len(), b.len()));
        }

        #[test]
        fn diff_is_deterministic(a in small_lines(), b in small_lines()) {
            let differ = TextDiffer::new(&DiffOptions::default()).unwrap();
            prop_assert_eq!(differ.diff(&a, &b), differ.diff(&a, &b));
        }
    }
}
