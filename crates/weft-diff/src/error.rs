//! Error types for the diff crate.

use weft_types::TypeError;

/// Errors that can occur during diff operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// The configured step or time budget ran out before matching finished.
    #[error("match budget exhausted after {steps} steps")]
    ResourceExhausted { steps: u64 },

    /// The computation was cancelled through its token.
    #[error("diff cancelled")]
    Cancelled,

    /// A text filter is not a valid regular expression.
    #[error("invalid text filter {pattern:?}: {reason}")]
    InvalidFilter { pattern: String, reason: String },

    /// A chunk list failed validation.
    #[error(transparent)]
    Invariant(#[from] TypeError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
