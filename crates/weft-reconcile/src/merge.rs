//! Incremental upkeep of a three-way merge.
//!
//! The ancestor-to-side chunk lists are reconciled with the windowed pair
//! algorithm; regions are then re-derived from them. Conflict regions that
//! touch an edit are always invalidated whole.

use std::ops::Range;

use tracing::debug;
use weft_merge::{MergeOptions, MergeResult, ThreeWayMerger};
use weft_types::{ChunkList, MergeRegion, MergeSide, Sequence, Side};

use crate::edit::{touches, Edit};
use crate::error::{ReconcileError, ReconcileResult};
use crate::pair::reconcile_with;

/// An ancestor and two live derived sequences with their merge, kept
/// current edit by edit.
#[derive(Clone, Debug)]
pub struct MergeReconciler {
    ancestor: Sequence,
    a: Sequence,
    b: Sequence,
    oa: ChunkList,
    ob: ChunkList,
    result: MergeResult,
    merger: ThreeWayMerger,
}

impl MergeReconciler {
    pub fn new(
        ancestor: Sequence,
        a: Sequence,
        b: Sequence,
        opts: &MergeOptions,
    ) -> ReconcileResult<Self> {
        let merger = ThreeWayMerger::new(opts)?;
        let oa = merger.side_diff(ancestor.lines(), a.lines(), "a");
        let ob = merger.side_diff(ancestor.lines(), b.lines(), "b");
        let result = merger.merge_with(ancestor.lines(), a.lines(), b.lines(), &oa, &ob);
        Ok(Self {
            ancestor,
            a,
            b,
            oa,
            ob,
            result,
            merger,
        })
    }

    pub fn sequence(&self, side: MergeSide) -> &Sequence {
        match side {
            MergeSide::Ancestor => &self.ancestor,
            MergeSide::A => &self.a,
            MergeSide::B => &self.b,
        }
    }

    /// The current merge. Fetch it again after every edit.
    pub fn result(&self) -> &MergeResult {
        &self.result
    }

    /// The ancestor-to-side chunk list for `A` or `B`.
    pub fn pair(&self, side: MergeSide) -> Option<&ChunkList> {
        match side {
            MergeSide::A => Some(&self.oa),
            MergeSide::B => Some(&self.ob),
            MergeSide::Ancestor => None,
        }
    }

    /// Apply an edit already made to `updated`, the new version of
    /// `edit.side`. Returns the invalidated region index range.
    pub fn apply_edit(
        &mut self,
        edit: &Edit<MergeSide>,
        updated: Sequence,
    ) -> ReconcileResult<Range<usize>> {
        let current = self.sequence(edit.side).version();
        if updated.version() <= current {
            return Err(ReconcileError::StaleVersion {
                current,
                got: updated.version(),
            });
        }

        let differ = self.merger.differ();
        let (o, a, b) = match edit.side {
            MergeSide::Ancestor => (&updated, &self.a, &self.b),
            MergeSide::A => (&self.ancestor, &updated, &self.b),
            MergeSide::B => (&self.ancestor, &self.a, &updated),
        };
        let (oa, ob) = match edit.side {
            MergeSide::Ancestor => {
                let on_ancestor = edit.on(Side::A);
                (
                    reconcile_with(differ, &on_ancestor, &self.oa, o.lines(), a.lines(), None)?.chunks,
                    reconcile_with(differ, &on_ancestor, &self.ob, o.lines(), b.lines(), None)?.chunks,
                )
            }
            MergeSide::A => (
                reconcile_with(differ, &edit.on(Side::B), &self.oa, o.lines(), a.lines(), None)?.chunks,
                self.ob.clone(),
            ),
            MergeSide::B => (
                self.oa.clone(),
                reconcile_with(differ, &edit.on(Side::B), &self.ob, o.lines(), b.lines(), None)?.chunks,
            ),
        };

        let result = self
            .merger
            .merge_with(o.lines(), a.lines(), b.lines(), &oa, &ob)
            .with_generation(self.result.generation() + 1);
        debug_assert!(result.validate().is_ok(), "reconciled regions must cover all sides");
        let invalidated = invalidated_regions(self.result.regions(), result.regions(), edit);
        debug!(
            side = ?edit.side,
            start = edit.start,
            delta = edit.delta(),
            invalidated = ?invalidated,
            regions = result.len(),
            conflicts = result.conflict_count(),
            "merge reconciled"
        );

        match edit.side {
            MergeSide::Ancestor => self.ancestor = updated,
            MergeSide::A => self.a = updated,
            MergeSide::B => self.b = updated,
        }
        self.oa = oa;
        self.ob = ob;
        self.result = result;
        Ok(invalidated)
    }

    /// Replace `range` of one sequence with `lines` and reconcile.
    pub fn replace(
        &mut self,
        side: MergeSide,
        range: Range<usize>,
        lines: Vec<String>,
    ) -> ReconcileResult<Range<usize>> {
        let edit = Edit::new(side, range.start, range.len(), lines.len());
        let len = self.sequence(side).len();
        let updated = self
            .sequence(side)
            .splice(range.clone(), lines)
            .map_err(|_| ReconcileError::EditOutOfBounds {
                start: range.start,
                end: range.end,
                len,
            })?;
        self.apply_edit(&edit, updated)
    }
}

/// Regions of `new` that differ from `old`, widened to every conflict
/// touching the edit.
fn invalidated_regions(
    old: &[MergeRegion],
    new: &[MergeRegion],
    edit: &Edit<MergeSide>,
) -> Range<usize> {
    let prefix = old.iter().zip(new).take_while(|(o, n)| o == n).count();
    let room = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(room)
        .take_while(|(o, n)| &o.shifted_on(edit.side, edit.delta()) == *n)
        .count();

    let mut range = prefix..new.len() - suffix;
    let span = edit.new_range();
    for (i, region) in new.iter().enumerate() {
        if region.is_conflict() && touches(region.range(edit.side), &span) {
            range.start = range.start.min(i);
            range.end = range.end.max(i + 1);
        }
    }
    range
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use weft_types::RegionTag;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn seq(items: &[&str]) -> Sequence {
        Sequence::new(lines(items))
    }

    fn reconciler(o: &[&str], a: &[&str], b: &[&str]) -> MergeReconciler {
        MergeReconciler::new(seq(o), seq(a), seq(b), &MergeOptions::default()).unwrap()
    }

    #[test]
    fn resolving_a_conflict() {
        let mut rec = reconciler(&["a", "b", "c"], &["a", "X", "c"], &["a", "Y", "c"]);
        assert_eq!(rec.result().conflict_count(), 1);

        let inv = rec.replace(MergeSide::A, 1..2, lines(&["Y"])).unwrap();
        assert_eq!(inv, 1..2);
        assert_eq!(rec.result().conflict_count(), 0);
        assert_eq!(rec.result().regions()[1].tag, RegionTag::ChangedBoth);
        assert_eq!(rec.result().generation(), 1);
    }

    #[test]
    fn distant_edit_keeps_the_conflict() {
        let o: Vec<String> = (0..10).map(|i| format!("l{i}")).collect();
        let mut a = o.clone();
        a[1] = "X".into();
        let mut b = o.clone();
        b[1] = "Y".into();
        let mut rec = MergeReconciler::new(
            Sequence::new(o),
            Sequence::new(a),
            Sequence::new(b),
            &MergeOptions::default(),
        )
        .unwrap();
        let before = rec.result().regions().to_vec();
        assert!(before[1].is_conflict());

        let inv = rec.replace(MergeSide::A, 8..8, lines(&["new"])).unwrap();
        assert!(inv.start >= 2, "{inv:?}");
        assert_eq!(&rec.result().regions()[..2], &before[..2]);
        assert_eq!(rec.result().conflict_count(), 1);
        assert_eq!(rec.sequence(MergeSide::A).get(8), Some("new"));
    }

    #[test]
    fn edits_touching_a_conflict_invalidate_it() {
        let mut rec = reconciler(
            &["a", "b", "c", "d"],
            &["a", "X", "c", "d"],
            &["a", "Y", "c", "d"],
        );
        let inv = rec.replace(MergeSide::B, 2..2, lines(&["extra"])).unwrap();
        let conflict = rec
            .result()
            .regions()
            .iter()
            .position(MergeRegion::is_conflict)
            .unwrap();
        assert!(inv.contains(&conflict), "{inv:?} should contain {conflict}");
    }

    #[test]
    fn ancestor_edits_reclassify() {
        let mut rec = reconciler(&["a", "b", "c"], &["a", "X", "c"], &["a", "b", "c"]);
        assert_eq!(rec.result().regions()[1].tag, RegionTag::ChangedA);

        rec.replace(MergeSide::Ancestor, 1..2, lines(&["X"])).unwrap();
        let tags: Vec<RegionTag> = rec.result().regions().iter().map(|r| r.tag).collect();
        assert!(tags.contains(&RegionTag::ChangedB));
        assert!(!tags.contains(&RegionTag::ChangedA));
        assert!(rec.pair(MergeSide::A).unwrap().is_identical());
    }

    #[test]
    fn stale_versions_are_rejected() {
        let mut rec = reconciler(&["a"], &["a"], &["a"]);
        rec.replace(MergeSide::A, 0..1, lines(&["b"])).unwrap();
        let err = rec
            .apply_edit(&Edit::new(MergeSide::A, 0, 0, 0), seq(&["c"]))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::StaleVersion { current: 1, got: 0 }));
    }

    fn small_lines() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d"]), 0..16)
            .prop_map(|v| v.into_iter().map(String::from).collect())
    }

    proptest! {
        #[test]
        fn reconciled_merges_stay_valid(
            o in small_lines(),
            a in small_lines(),
            b in small_lines(),
            which in 0usize..3,
            start in 0usize..32,
            removed in 0usize..6,
            inserted in small_lines(),
        ) {
            let mut rec = MergeReconciler::new(
                Sequence::new(o),
                Sequence::new(a),
                Sequence::new(b),
                &MergeOptions::default(),
            )
            .unwrap();
            let side = [MergeSide::Ancestor, MergeSide::A, MergeSide::B][which];
            let len = rec.sequence(side).len();
            let start = start % (len + 1);
            let removed = removed % (len - start + 1);
            rec.replace(side, start..start + removed, inserted).unwrap();

            prop_assert!(rec.result().validate().is_ok());
            prop_assert!(rec.pair(MergeSide::A).unwrap().validate().is_ok());
            prop_assert!(rec.pair(MergeSide::B).unwrap().validate().is_ok());
            prop_assert_eq!(rec.result().len_of(side), rec.sequence(side).len());
        }
    }
}
