//! Pairwise diff engine for weft.
//!
//! Computes line alignments between two sequences with a greedy
//! longest-contiguous-match heuristic and turns them into typed chunk lists.
//!
//! # Key Types
//!
//! - [`SequenceMatcher`] -- Greedy block matcher over any `Hash + Eq` elements
//! - [`build_chunks`] -- Match blocks to a coalesced, validated [`ChunkList`]
//! - [`TextDiffer`] / [`diff_pair`] -- Line diff honouring [`DiffOptions`]
//! - [`LineNormalizer`] -- Whitespace, case, blank-line and regex filters
//! - [`CachedMatcher`] -- Memoised diffs with LRU-style eviction
//! - [`unified_diff`] -- Patch output
//! - [`inline_diff`] -- Character-level changes inside a replaced line
//!
//! [`ChunkList`]: weft_types::ChunkList
//! [`DiffOptions`]: weft_types::DiffOptions

pub mod cache;
pub mod chunks;
pub mod error;
pub mod inline;
pub mod matcher;
pub mod normalize;
pub mod pair;
pub mod patch;

pub use cache::CachedMatcher;
pub use chunks::{build_chunks, coalesce, coarse_chunks};
pub use error::{DiffError, DiffResult};
pub use inline::{inline_chunk, inline_diff, InlineChange, LineInline};
pub use matcher::{Budget, SequenceMatcher};
pub use normalize::LineNormalizer;
pub use pair::{diff_pair, diff_records, TextDiffer};
pub use patch::unified_diff;
