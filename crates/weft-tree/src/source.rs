//! Storage abstraction for the trees being compared.
//!
//! The walker never touches the filesystem directly; it goes through a
//! [`TreeSource`]. [`FsSource`](crate::FsSource) reads real directories and
//! [`InMemoryTree`](crate::InMemoryTree) serves tests and synthetic trees.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// What an entry is on one side of the comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Missing,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Dir => "dir",
            EntryKind::Symlink => "symlink",
            EntryKind::Missing => "missing",
        }
    }
}

/// The metadata the comparison needs from one entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryMeta {
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<SystemTime>,
    /// Unix permission bits, where the source has them.
    pub mode: Option<u32>,
}

impl EntryMeta {
    pub fn dir() -> Self {
        Self {
            kind: EntryKind::Dir,
            size: 0,
            modified: None,
            mode: None,
        }
    }
}

/// Read-only access to a tree of named entries.
///
/// Paths are whatever the source understands; the walker only ever joins
/// names returned by [`list_dir`](Self::list_dir) onto a root path.
pub trait TreeSource: Send + Sync + fmt::Debug {
    /// Names of the entries directly inside `path`.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Metadata of `path` itself, not following a final symlink.
    fn symlink_metadata(&self, path: &Path) -> io::Result<EntryMeta>;

    /// Metadata of `path`, following symlinks.
    fn metadata(&self, path: &Path) -> io::Result<EntryMeta>;

    /// Full contents of a file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// The path with every symlink resolved.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// One tree to compare: a source and the root path inside it.
#[derive(Clone, Debug)]
pub struct TreeRoot {
    pub source: Arc<dyn TreeSource>,
    pub path: PathBuf,
}

impl TreeRoot {
    pub fn new(source: Arc<dyn TreeSource>, path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            path: path.into(),
        }
    }

    /// A root on the local filesystem.
    pub fn fs(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(crate::fs::FsSource), path)
    }
}
