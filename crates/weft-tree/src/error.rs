use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a tree comparison as a whole.
///
/// Failures on individual entries do not surface here; they are recorded on
/// the entry as [`EntryState::Error`](crate::EntryState::Error).
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exclude pattern: {0}")]
    Pattern(String),

    #[error("expected 2 or 3 roots, got {0}")]
    RootCount(usize),

    #[error("invalid options: {0}")]
    Options(#[from] weft_diff::DiffError),

    #[error("merge setup failed: {0}")]
    Merge(#[from] weft_merge::MergeError),

    #[error("tree walk failed: {0}")]
    Failed(String),

    #[error("tree comparison cancelled")]
    Cancelled,
}

/// Result alias for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
