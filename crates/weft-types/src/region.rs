use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::chunk::shift_range;

/// One of the three inputs of a merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeSide {
    Ancestor,
    A,
    B,
}

/// Classification of a [`MergeRegion`] relative to the common ancestor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionTag {
    /// Neither side touched the ancestor lines.
    Unchanged,
    /// Only side A changed the region.
    ChangedA,
    /// Only side B changed the region.
    ChangedB,
    /// Both sides made the same change; resolves automatically.
    ChangedBoth,
    /// Both sides changed the region differently.
    Conflict,
}

impl RegionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionTag::Unchanged => "unchanged",
            RegionTag::ChangedA => "changed-a",
            RegionTag::ChangedB => "changed-b",
            RegionTag::ChangedBoth => "changed-both",
            RegionTag::Conflict => "conflict",
        }
    }
}

/// The competing contents of a conflict region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCandidates {
    pub ancestor: Vec<String>,
    pub a: Vec<String>,
    pub b: Vec<String>,
}

/// A three-way region: a range of the ancestor and the matching ranges of
/// both derived sequences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRegion {
    pub tag: RegionTag,
    pub ancestor: Range<usize>,
    pub a: Range<usize>,
    pub b: Range<usize>,
    /// Present only on [`RegionTag::Conflict`] regions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictCandidates>,
}

impl MergeRegion {
    pub fn new(tag: RegionTag, ancestor: Range<usize>, a: Range<usize>, b: Range<usize>) -> Self {
        Self {
            tag,
            ancestor,
            a,
            b,
            conflict: None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.tag == RegionTag::Conflict
    }

    /// The range on the given side.
    pub fn range(&self, side: MergeSide) -> &Range<usize> {
        match side {
            MergeSide::Ancestor => &self.ancestor,
            MergeSide::A => &self.a,
            MergeSide::B => &self.b,
        }
    }

    /// A copy with the range on `side` moved by `delta`.
    pub fn shifted_on(&self, side: MergeSide, delta: isize) -> Self {
        let mut region = self.clone();
        match side {
            MergeSide::Ancestor => region.ancestor = shift_range(&self.ancestor, delta),
            MergeSide::A => region.a = shift_range(&self.a, delta),
            MergeSide::B => region.b = shift_range(&self.b, delta),
        }
        region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_serialize_kebab_case() {
        let json = serde_json::to_string(&RegionTag::ChangedBoth).unwrap();
        assert_eq!(json, "\"changed-both\"");
        assert_eq!(RegionTag::ChangedBoth.as_str(), "changed-both");
    }

    #[test]
    fn shifting_one_side() {
        let region = MergeRegion::new(RegionTag::ChangedA, 2..3, 2..5, 2..3);
        let moved = region.shifted_on(MergeSide::A, 2);
        assert_eq!(moved.a, 4..7);
        assert_eq!(moved.ancestor, 2..3);
        assert_eq!(moved.range(MergeSide::B), &(2..3));
    }

    #[test]
    fn conflict_candidates_skipped_when_absent() {
        let region = MergeRegion::new(RegionTag::Unchanged, 0..1, 0..1, 0..1);
        let json = serde_json::to_string(&region).unwrap();
        assert!(!json.contains("conflict"));
        assert!(!region.is_conflict());
    }
}
