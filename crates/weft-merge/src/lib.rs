//! Three-way merge for weft.
//!
//! Diffs a common ancestor against two derived sequences and synthesises an
//! ordered list of [`MergeRegion`]s covering all three, classifying each as
//! unchanged, changed on one side, changed identically on both, or in
//! conflict.
//!
//! # Key Types
//!
//! - [`ThreeWayMerger`] / [`diff_triple`] -- Region synthesis from two pair diffs
//! - [`MergeResult`] -- The regions plus merged-output helpers
//! - [`MergeOptions`] -- Diff options and conflict coalescing policy
//! - [`MarkerLabels`] -- Labels for diff3-style conflict markers
//!
//! [`MergeRegion`]: weft_types::MergeRegion

pub mod error;
pub mod merger;
pub mod output;

pub use error::{MergeError, Result};
pub use merger::{diff_triple, merge_regions, MergeOptions, MergeResult, ThreeWayMerger};
pub use output::MarkerLabels;
