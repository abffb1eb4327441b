use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use weft_merge::MergeResult;
use weft_types::ChunkList;

use crate::source::EntryKind;

/// Comparison state of a tree entry across all sides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryState {
    /// Identical on every side.
    Same,
    /// Equal once the text filters are applied.
    SameFiltered,
    /// Looks equal from size and modification time alone.
    DodgySame,
    /// Bytes differ and the files are too large to compare filtered.
    DodgyDifferent,
    /// Differs on at least one side.
    Changed,
    /// Only on the first side.
    NewLeft,
    /// Only on the last side.
    NewRight,
    /// On both outer sides of a three-way comparison but not the middle.
    NewOther,
    /// In the middle of a three-way comparison but gone from an outer side.
    Deleted,
    /// Could not be compared; carries the reason.
    Error(String),
}

impl EntryState {
    /// Same, same once filtered, or probably same.
    pub fn is_same_like(&self) -> bool {
        matches!(
            self,
            EntryState::Same | EntryState::SameFiltered | EntryState::DodgySame
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EntryState::Error(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Same => "same",
            EntryState::SameFiltered => "same-filtered",
            EntryState::DodgySame => "dodgy-same",
            EntryState::DodgyDifferent => "dodgy-different",
            EntryState::Changed => "changed",
            EntryState::NewLeft => "new-left",
            EntryState::NewRight => "new-right",
            EntryState::NewOther => "new-other",
            EntryState::Deleted => "deleted",
            EntryState::Error(_) => "error",
        }
    }
}

/// Line-level diff attached to a changed text file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileDiff {
    Pair(ChunkList),
    /// Three-way merge with the middle side as ancestor.
    Triple(MergeResult),
}

/// One node of a tree comparison. Directories own their children, sorted
/// by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    /// Path relative to the roots.
    pub path: PathBuf,
    /// Kind on each side, in root order.
    pub kinds: Vec<EntryKind>,
    pub state: EntryState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<FileDiff>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeEntry>,
}

impl TreeEntry {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, kinds: Vec<EntryKind>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kinds,
            state: EntryState::Same,
            diff: None,
            children: Vec::new(),
        }
    }

    /// Returns `true` if the entry is a directory on any side.
    pub fn is_dir(&self) -> bool {
        self.kinds.contains(&EntryKind::Dir)
    }

    /// Depth-first, parents before children.
    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let entry = stack.pop()?;
            stack.extend(entry.children.iter().rev());
            Some(entry)
        })
    }

    /// The entry at `path` relative to this one.
    pub fn find(&self, path: impl AsRef<Path>) -> Option<&TreeEntry> {
        let mut current = self;
        for component in path.as_ref().components() {
            let name = component.as_os_str().to_string_lossy();
            current = current.children.iter().find(|c| c.name == name)?;
        }
        Some(current)
    }

    /// Number of entries (this one included) in the given state.
    pub fn count(&self, state: &EntryState) -> usize {
        self.iter().filter(|e| &e.state == state).count()
    }

    /// Entries that are not same-like, depth-first.
    pub fn differing(&self) -> impl Iterator<Item = &TreeEntry> {
        self.iter().filter(|e| !e.state.is_same_like())
    }
}
