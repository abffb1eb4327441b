//! Directory tree comparison for weft.
//!
//! Walks two or three trees in lock step, pairs entries by name and
//! classifies each one. Per-entry failures are recorded on the entry and
//! never abort the walk.
//!
//! # Key Types
//!
//! - [`TreeSource`] -- Read-only access to a tree; [`FsSource`] and [`InMemoryTree`]
//! - [`TreeDiffer`] / [`diff_tree`] -- Synchronous lock-step walk
//! - [`TreeEntry`] -- Result node with an [`EntryState`] per entry
//! - [`spawn_tree_diff`] -- Cancellable background walk streaming [`WalkEvent`]s
//! - [`TreeOptions`] -- Name matching, sameness shortcuts and excludes

pub mod compare;
pub mod entry;
pub mod error;
pub mod filter;
pub mod fs;
pub mod memory;
pub mod options;
pub mod source;
pub mod walker;
pub mod worker;

pub use compare::{compare_entries, FileComparison, Side};
pub use entry::{EntryState, FileDiff, TreeEntry};
pub use error::{TreeError, TreeResult};
pub use filter::NameFilter;
pub use fs::FsSource;
pub use memory::InMemoryTree;
pub use options::{default_excludes, TreeOptions};
pub use source::{EntryKind, EntryMeta, TreeRoot, TreeSource};
pub use walker::{diff_tree, TreeDiffer};
pub use worker::{spawn_tree_diff, EntryReport, TreeWorker, WalkEvent};
