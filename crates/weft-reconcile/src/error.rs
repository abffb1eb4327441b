use thiserror::Error;
use weft_diff::DiffError;
use weft_merge::MergeError;

/// Errors produced while reconciling edits.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("stale sequence version: have {current}, got {got}")]
    StaleVersion { current: u64, got: u64 },

    #[error("edit {start}..{end} outside sequence of length {len}")]
    EditOutOfBounds { start: usize, end: usize, len: usize },

    #[error("edit does not match the new sequence: expected {expected} lines, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A newer generation started before this computation finished.
    #[error("computation superseded by a newer generation")]
    Superseded,

    #[error("reconcile service has shut down")]
    Closed,

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("merge error: {0}")]
    Merge(#[from] MergeError),
}

/// Convenience alias for reconcile results.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
