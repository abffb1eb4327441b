//! Region synthesis from the ancestor-to-side diffs.
//!
//! Changes of both sides are laid out in ancestor coordinates and grouped
//! into clusters of overlapping ranges. An empty range (a pure insertion)
//! touching another range counts as overlapping. Each cluster becomes one
//! region; the ancestor stretches between clusters become unchanged regions.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;
use weft_diff::{LineNormalizer, TextDiffer};
use weft_types::{
    Chunk, ChunkList, ChunkTag, ConflictCandidates, DiffOptions, MergeRegion, MergeSide,
    RegionTag, Sequence, TypeError, TypeResult,
};

use crate::error::Result;

/// Options for a three-way merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Line comparison options for both ancestor diffs.
    pub diff: DiffOptions,
    /// Join conflict regions that touch into one.
    pub coalesce_adjacent_conflicts: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            diff: DiffOptions::default(),
            coalesce_adjacent_conflicts: true,
        }
    }
}

/// The regions of a three-way comparison, in ancestor order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    regions: Vec<MergeRegion>,
    len_ancestor: usize,
    len_a: usize,
    len_b: usize,
    generation: u64,
}

impl MergeResult {
    pub fn new(regions: Vec<MergeRegion>, len_ancestor: usize, len_a: usize, len_b: usize) -> Self {
        Self {
            regions,
            len_ancestor,
            len_a,
            len_b,
            generation: 0,
        }
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn regions(&self) -> &[MergeRegion] {
        &self.regions
    }

    pub fn into_regions(self) -> Vec<MergeRegion> {
        self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len_of(&self, side: MergeSide) -> usize {
        match side {
            MergeSide::Ancestor => self.len_ancestor,
            MergeSide::A => self.len_a,
            MergeSide::B => self.len_b,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &MergeRegion> {
        self.regions.iter().filter(|r| r.is_conflict())
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts().count()
    }

    pub fn has_conflicts(&self) -> bool {
        self.regions.iter().any(MergeRegion::is_conflict)
    }

    /// Returns `true` if no region changes anything.
    pub fn is_unchanged(&self) -> bool {
        self.regions.iter().all(|r| r.tag == RegionTag::Unchanged)
    }

    /// Check that the regions cover all three sequences contiguously.
    pub fn validate(&self) -> TypeResult<()> {
        let mut pos = [0usize; 3];
        let sides = [MergeSide::Ancestor, MergeSide::A, MergeSide::B];
        for (i, region) in self.regions.iter().enumerate() {
            for (slot, side) in sides.iter().enumerate() {
                let range = region.range(*side);
                if range.start != pos[slot] || range.start > range.end {
                    return Err(TypeError::Invariant(format!(
                        "region {i} has {side:?} range {range:?}, expected start {}",
                        pos[slot]
                    )));
                }
                pos[slot] = range.end;
            }
        }
        let lens = [self.len_ancestor, self.len_a, self.len_b];
        if pos != lens {
            return Err(TypeError::Invariant(format!(
                "regions cover {pos:?}, sequences have {lens:?}"
            )));
        }
        Ok(())
    }
}

/// Three-way merger for one set of options.
#[derive(Clone, Debug)]
pub struct ThreeWayMerger {
    differ: TextDiffer,
    coalesce: bool,
}

impl ThreeWayMerger {
    pub fn new(opts: &MergeOptions) -> Result<Self> {
        Ok(Self {
            differ: TextDiffer::new(&opts.diff)?,
            coalesce: opts.coalesce_adjacent_conflicts,
        })
    }

    pub fn differ(&self) -> &TextDiffer {
        &self.differ
    }

    /// Merge `a` and `b` against their common `ancestor`.
    pub fn merge(&self, ancestor: &[String], a: &[String], b: &[String]) -> MergeResult {
        let oa = self.side_diff(ancestor, a, "a");
        let ob = self.side_diff(ancestor, b, "b");
        self.merge_with(ancestor, a, b, &oa, &ob)
    }

    /// Merge from already computed ancestor-to-side chunk lists.
    pub fn merge_with(
        &self,
        ancestor: &[String],
        a: &[String],
        b: &[String],
        oa: &ChunkList,
        ob: &ChunkList,
    ) -> MergeResult {
        let regions = merge_regions(ancestor, a, b, oa, ob, self.differ.normalizer(), self.coalesce);
        let result = MergeResult::new(regions, ancestor.len(), a.len(), b.len());
        debug!(
            len_ancestor = ancestor.len(),
            regions = result.len(),
            conflicts = result.conflict_count(),
            "three-way merge computed"
        );
        result
    }

    /// Diff the ancestor against one side, skipping the matcher when the
    /// side is unchanged.
    pub fn side_diff(&self, ancestor: &[String], side: &[String], label: &str) -> ChunkList {
        if ancestor == side {
            debug!(side = label, "side matches ancestor, taking the other side");
            let len = ancestor.len();
            return ChunkList::new(vec![Chunk::new(ChunkTag::Equal, 0..len, 0..len)], len, len);
        }
        self.differ.diff(ancestor, side)
    }
}

/// Merge three sequences under `opts`.
///
/// Fails only when a text filter does not compile.
pub fn diff_triple(
    ancestor: &Sequence,
    a: &Sequence,
    b: &Sequence,
    opts: &MergeOptions,
) -> Result<MergeResult> {
    Ok(ThreeWayMerger::new(opts)?.merge(ancestor.lines(), a.lines(), b.lines()))
}

struct Change {
    ancestor: Range<usize>,
    side: MergeSide,
}

struct Cluster {
    ancestor: Range<usize>,
    changed_a: bool,
    changed_b: bool,
}

impl Cluster {
    fn touches(&self, range: &Range<usize>) -> bool {
        let (lo, hi) = (self.ancestor.start, self.ancestor.end);
        if range.is_empty() || lo == hi {
            range.start <= hi && lo <= range.end
        } else {
            range.start < hi && lo < range.end
        }
    }
}

/// Regions for `ancestor`, `a` and `b` from the ancestor-to-side lists `oa`
/// and `ob`.
pub fn merge_regions(
    ancestor: &[String],
    a: &[String],
    b: &[String],
    oa: &ChunkList,
    ob: &ChunkList,
    normalizer: &LineNormalizer,
    coalesce: bool,
) -> Vec<MergeRegion> {
    let mut changes: Vec<Change> = oa
        .changes()
        .map(|c| Change {
            ancestor: c.a.clone(),
            side: MergeSide::A,
        })
        .chain(ob.changes().map(|c| Change {
            ancestor: c.a.clone(),
            side: MergeSide::B,
        }))
        .collect();
    changes.sort_by_key(|c| (c.ancestor.start, c.ancestor.end));

    let mut clusters: Vec<Cluster> = Vec::new();
    for change in changes {
        let (is_a, is_b) = (change.side == MergeSide::A, change.side == MergeSide::B);
        match clusters.last_mut() {
            Some(cluster) if cluster.touches(&change.ancestor) => {
                cluster.ancestor.end = cluster.ancestor.end.max(change.ancestor.end);
                cluster.changed_a |= is_a;
                cluster.changed_b |= is_b;
            }
            _ => clusters.push(Cluster {
                ancestor: change.ancestor,
                changed_a: is_a,
                changed_b: is_b,
            }),
        }
    }

    let mut regions: Vec<MergeRegion> = Vec::with_capacity(clusters.len() * 2 + 1);
    let mut pos = (0usize, 0usize, 0usize);
    for cluster in &clusters {
        let (olo, ohi) = (cluster.ancestor.start, cluster.ancestor.end);
        let (alo, ahi) = (project_start(oa, olo), project_end(oa, ohi));
        let (blo, bhi) = (project_start(ob, olo), project_end(ob, ohi));

        push_unchanged(&mut regions, pos.0..olo, pos.1..alo, pos.2..blo);

        let tag = match (cluster.changed_a, cluster.changed_b) {
            (true, false) => RegionTag::ChangedA,
            (false, true) => RegionTag::ChangedB,
            _ if normalizer.lines_equal(&a[alo..ahi], &b[blo..bhi]) => RegionTag::ChangedBoth,
            _ => RegionTag::Conflict,
        };
        push_change(&mut regions, tag, olo..ohi, alo..ahi, blo..bhi, coalesce);
        pos = (ohi, ahi, bhi);
    }
    push_unchanged(
        &mut regions,
        pos.0..ancestor.len(),
        pos.1..a.len(),
        pos.2..b.len(),
    );

    if regions.is_empty() {
        regions.push(MergeRegion::new(RegionTag::Unchanged, 0..0, 0..0, 0..0));
    }

    for region in regions.iter_mut().filter(|r| r.is_conflict()) {
        region.conflict = Some(ConflictCandidates {
            ancestor: ancestor[region.ancestor.clone()].to_vec(),
            a: a[region.a.clone()].to_vec(),
            b: b[region.b.clone()].to_vec(),
        });
    }
    regions
}

fn push_unchanged(
    regions: &mut Vec<MergeRegion>,
    ancestor: Range<usize>,
    a: Range<usize>,
    b: Range<usize>,
) {
    if ancestor.is_empty() && a.is_empty() && b.is_empty() {
        return;
    }
    regions.push(MergeRegion::new(RegionTag::Unchanged, ancestor, a, b));
}

fn push_change(
    regions: &mut Vec<MergeRegion>,
    tag: RegionTag,
    ancestor: Range<usize>,
    a: Range<usize>,
    b: Range<usize>,
    coalesce: bool,
) {
    if coalesce && tag == RegionTag::Conflict {
        if let Some(last) = regions.last_mut().filter(|r| r.is_conflict()) {
            last.ancestor.end = ancestor.end;
            last.a.end = a.end;
            last.b.end = b.end;
            return;
        }
    }
    regions.push(MergeRegion::new(tag, ancestor, a, b));
}

/// Side position where ancestor position `o` starts, taking any insertion
/// at `o` along.
fn project_start(list: &ChunkList, o: usize) -> usize {
    let chunks = list.chunks();
    let idx = chunks.partition_point(|c| c.a.end < o || (c.a.end == o && !c.a.is_empty()));
    match chunks.get(idx) {
        Some(c) if c.tag == ChunkTag::Equal && o > c.a.start => {
            c.b.start + (o - c.a.start).min(c.b.len())
        }
        Some(c) => c.b.start,
        None => list.len_b(),
    }
}

/// Side position where ancestor position `o` ends, taking any insertion at
/// `o` along.
fn project_end(list: &ChunkList, o: usize) -> usize {
    let chunks = list.chunks();
    let idx = chunks.partition_point(|c| c.a.start < o || (c.a.start == o && c.a.is_empty()));
    match idx.checked_sub(1).map(|i| &chunks[i]) {
        Some(c) if c.tag == ChunkTag::Equal && o < c.a.end => {
            c.b.start + (o - c.a.start).min(c.b.len())
        }
        Some(c) => c.b.end,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn merge(o: &[&str], a: &[&str], b: &[&str]) -> MergeResult {
        ThreeWayMerger::new(&MergeOptions::default())
            .unwrap()
            .merge(&lines(o), &lines(a), &lines(b))
    }

    fn shape(result: &MergeResult) -> Vec<(&'static str, Range<usize>, Range<usize>, Range<usize>)> {
        result
            .regions()
            .iter()
            .map(|r| (r.tag.as_str(), r.ancestor.clone(), r.a.clone(), r.b.clone()))
            .collect()
    }

    #[test]
    fn disjoint_changes_merge_cleanly() {
        let result = merge(
            &["a", "b", "c", "d", "e"],
            &["a", "B", "c", "d", "e"],
            &["a", "b", "c", "D", "e"],
        );
        assert_eq!(
            shape(&result),
            vec![
                ("unchanged", 0..1, 0..1, 0..1),
                ("changed-a", 1..2, 1..2, 1..2),
                ("unchanged", 2..3, 2..3, 2..3),
                ("changed-b", 3..4, 3..4, 3..4),
                ("unchanged", 4..5, 4..5, 4..5),
            ]
        );
        assert!(!result.has_conflicts());
        assert!(result.validate().is_ok());
    }

    #[test]
    fn same_line_changed_differently_conflicts() {
        let result = merge(&["a", "b", "c"], &["a", "X", "c"], &["a", "Y", "c"]);
        assert_eq!(result.conflict_count(), 1);
        let conflict = result.conflicts().next().unwrap();
        assert_eq!(conflict.ancestor, 1..2);
        let candidates = conflict.conflict.as_ref().unwrap();
        assert_eq!(candidates.ancestor, lines(&["b"]));
        assert_eq!(candidates.a, lines(&["X"]));
        assert_eq!(candidates.b, lines(&["Y"]));
    }

    #[test]
    fn identical_changes_resolve() {
        let result = merge(&["a", "b", "c"], &["a", "X", "c"], &["a", "X", "c"]);
        assert_eq!(
            shape(&result)[1],
            ("changed-both", 1..2, 1..2, 1..2)
        );
        assert!(!result.has_conflicts());
    }

    #[test]
    fn insertions_at_same_point_conflict() {
        let result = merge(&["a", "b"], &["a", "x", "b"], &["a", "y", "b"]);
        assert_eq!(
            shape(&result),
            vec![
                ("unchanged", 0..1, 0..1, 0..1),
                ("conflict", 1..1, 1..2, 1..2),
                ("unchanged", 1..2, 2..3, 2..3),
            ]
        );
    }

    #[test]
    fn insertion_touching_a_change_conflicts() {
        let result = merge(&["a", "b", "c"], &["a", "c"], &["a", "b", "n", "c"]);
        assert_eq!(result.conflict_count(), 1);
        assert_eq!(result.conflicts().next().unwrap().ancestor, 1..2);
    }

    #[test]
    fn adjacent_changes_on_different_sides_stay_apart() {
        let result = merge(&["a", "b", "c"], &["A", "b", "c"], &["a", "B", "c"]);
        assert!(!result.has_conflicts());
        assert_eq!(result.regions()[0].tag, RegionTag::ChangedA);
        assert_eq!(result.regions()[1].tag, RegionTag::ChangedB);
    }

    #[test]
    fn adjacent_conflicts_coalesce() {
        let o = lines(&["o0", "o1", "o2", "o3"]);
        let a = lines(&["a0", "o2", "ins", "o3"]);
        let b = lines(&["b0", "o1", "b2", "o3"]);

        let merged = ThreeWayMerger::new(&MergeOptions::default()).unwrap().merge(&o, &a, &b);
        assert_eq!(
            shape(&merged),
            vec![("conflict", 0..3, 0..3, 0..3), ("unchanged", 3..4, 3..4, 3..4)]
        );
        assert_eq!(merged.regions()[0].conflict.as_ref().unwrap().b, lines(&["b0", "o1", "b2"]));

        let split = ThreeWayMerger::new(&MergeOptions {
            coalesce_adjacent_conflicts: false,
            ..Default::default()
        })
        .unwrap()
        .merge(&o, &a, &b);
        assert_eq!(
            shape(&split),
            vec![
                ("conflict", 0..2, 0..1, 0..2),
                ("conflict", 2..3, 1..3, 2..3),
                ("unchanged", 3..4, 3..4, 3..4),
            ]
        );
    }

    #[test]
    fn all_empty_is_one_unchanged_region() {
        let result = merge(&[], &[], &[]);
        assert_eq!(shape(&result), vec![("unchanged", 0..0, 0..0, 0..0)]);
        assert!(result.is_unchanged());
    }

    #[test]
    fn unchanged_side_short_circuits() {
        let result = merge(&["a", "b"], &["a", "b"], &["a", "c", "b"]);
        assert_eq!(
            shape(&result),
            vec![
                ("unchanged", 0..1, 0..1, 0..1),
                ("changed-b", 1..1, 1..1, 1..2),
                ("unchanged", 1..2, 1..2, 2..3),
            ]
        );
    }

    #[test]
    fn whitespace_only_difference_between_sides_resolves() {
        let opts = MergeOptions {
            diff: DiffOptions {
                ignore_whitespace: weft_types::WhitespaceMode::Trailing,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = ThreeWayMerger::new(&opts).unwrap().merge(
            &lines(&["a", "b"]),
            &lines(&["a", "X "]),
            &lines(&["a", "X"]),
        );
        assert_eq!(result.regions()[1].tag, RegionTag::ChangedBoth);
    }

    #[test]
    fn diff_triple_on_sequences() {
        let o = Sequence::from(vec!["1", "2", "3"]);
        let a = Sequence::from(vec!["1", "2", "3", "4"]);
        let b = Sequence::from(vec!["0", "1", "2", "3"]);
        let result = diff_triple(&o, &a, &b, &MergeOptions::default()).unwrap();
        assert!(!result.has_conflicts());
        assert_eq!(result.len_of(MergeSide::A), 4);
    }

    fn small_lines() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d"]), 0..16)
            .prop_map(|v| v.into_iter().map(String::from).collect())
    }

    proptest! {
        #[test]
        fn regions_cover_all_sides(o in small_lines(), a in small_lines(), b in small_lines()) {
            let merger = ThreeWayMerger::new(&MergeOptions::default()).unwrap();
            let result = merger.merge(&o, &a, &b);
            prop_assert!(result.validate().is_ok(), "{:?}", result.validate());
        }

        #[test]
        fn unchanged_side_yields_other(o in small_lines(), b in small_lines()) {
            let merger = ThreeWayMerger::new(&MergeOptions::default()).unwrap();
            let result = merger.merge(&o, &o, &b);
            prop_assert!(!result.has_conflicts());
            prop_assert_eq!(result.merged(&o, &b).unwrap(), b.clone());

            let result = merger.merge(&o, &b, &o);
            prop_assert_eq!(result.merged(&b, &o).unwrap(), b.clone());
        }

        #[test]
        fn unchanged_side_mirrors_pair_diff(o in small_lines(), b in small_lines()) {
            let merger = ThreeWayMerger::new(&MergeOptions::default()).unwrap();
            let result = merger.merge(&o, &o, &b);
            let pair = merger.differ().diff(&o, &b);
            prop_assert_eq!(result.len(), pair.len());
            for (region, chunk) in result.regions().iter().zip(pair.iter()) {
                let expected = if chunk.is_change() { RegionTag::ChangedB } else { RegionTag::Unchanged };
                prop_assert_eq!(region.tag, expected);
                prop_assert_eq!(&region.ancestor, &chunk.a);
                prop_assert_eq!(&region.a, &chunk.a);
                prop_assert_eq!(&region.b, &chunk.b);
            }
        }

        #[test]
        fn same_change_on_both_sides_never_conflicts(o in small_lines(), a in small_lines()) {
            let merger = ThreeWayMerger::new(&MergeOptions::default()).unwrap();
            let result = merger.merge(&o, &a, &a);
            prop_assert!(!result.has_conflicts());
            prop_assert_eq!(result.merged(&a, &a).unwrap(), a.clone());
        }
    }
}
