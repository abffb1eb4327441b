//! Foundation types for weft.
//!
//! This crate provides the data model shared by every other weft crate: the
//! versioned line [`Sequence`], the alignment primitives ([`MatchBlock`],
//! [`Chunk`], [`ChunkList`]), the three-way [`MergeRegion`], and the option
//! structs that drive a comparison.
//!
//! # Key Types
//!
//! - [`Sequence`] -- Immutable, versioned list of lines
//! - [`MatchBlock`] -- Maximal run of equal elements between two sequences
//! - [`Chunk`] / [`ChunkTag`] -- Typed, range-addressed alignment unit
//! - [`ChunkList`] -- A validated partition of both sequences into chunks
//! - [`MergeRegion`] / [`RegionTag`] -- Three-way analog of a chunk
//! - [`DiffOptions`] -- Line normalisation, autojunk and work limits
//! - [`CancelToken`] -- Cooperative cancellation flag shared with workers

pub mod cancel;
pub mod chunk;
pub mod error;
pub mod options;
pub mod region;
pub mod sequence;

pub use cancel::CancelToken;
pub use chunk::{shift_range, Chunk, ChunkList, ChunkTag, MatchBlock, Side};
pub use error::{TypeError, TypeResult};
pub use options::{DiffOptions, MatchLimits, WhitespaceMode};
pub use region::{ConflictCandidates, MergeRegion, MergeSide, RegionTag};
pub use sequence::{split_lines, Sequence};
