//! Incremental reconciliation for weft.
//!
//! Keeps chunk lists and merges current while the underlying sequences are
//! being edited, re-running the matcher only over the chunks an edit
//! touches.
//!
//! # Key Types
//!
//! - [`Edit`] -- A contiguous replacement in one live sequence
//! - [`reconcile`] / [`PairReconciler`] -- Windowed re-diff of a two-way chunk list
//! - [`MergeReconciler`] -- The same for a three-way merge; conflicts are invalidated whole
//! - [`Generations`] -- Monotonic tickets; stale results are never published
//! - [`ReconcileService`] -- Latest-only background recompute on tokio

pub mod edit;
pub mod error;
pub mod generation;
pub mod merge;
pub mod pair;
pub mod service;

pub use edit::Edit;
pub use error::{ReconcileError, ReconcileResult};
pub use generation::{Generations, Ticket};
pub use merge::MergeReconciler;
pub use pair::{reconcile, reconcile_with, PairReconciler, Reconciled};
pub use service::{ReconcileService, Snapshot};
