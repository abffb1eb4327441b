use thiserror::Error;
use weft_diff::DiffError;

/// Errors produced by merge operations.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("merge has {conflicts} unresolved conflict(s)")]
    Unresolved { conflicts: usize },
}

/// Convenience alias for merge results.
pub type Result<T> = std::result::Result<T, MergeError>;
