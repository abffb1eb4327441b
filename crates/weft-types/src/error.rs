use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("range {start}..{end} is out of bounds for length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("chunk list invariant violated: {0}")]
    Invariant(String),
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
