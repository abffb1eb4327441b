//! Background tree comparison with streamed progress.
//!
//! The walk runs on tokio's blocking pool. Every finished entry is reported
//! on a channel, followed by exactly one terminal event.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use weft_types::CancelToken;

use crate::entry::{EntryState, TreeEntry};
use crate::error::TreeError;
use crate::options::TreeOptions;
use crate::source::{EntryKind, TreeRoot};
use crate::walker::TreeDiffer;

/// Capacity of the event channel.
const EVENT_CAPACITY: usize = 256;

/// Summary of one compared entry, without its children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryReport {
    pub path: PathBuf,
    pub state: EntryState,
    pub kinds: Vec<EntryKind>,
}

/// Events emitted by a [`TreeWorker`].
#[derive(Debug)]
pub enum WalkEvent {
    /// An entry and all of its children have been compared.
    Entry(EntryReport),
    /// The walk completed; carries the full result.
    Finished(Box<TreeEntry>),
    /// The walk stopped because it was cancelled.
    Cancelled,
    /// The walk could not start or aborted.
    Failed(String),
}

impl WalkEvent {
    /// Returns `true` for the event that ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WalkEvent::Entry(_))
    }
}

/// Handle to a running tree comparison.
#[derive(Debug)]
pub struct TreeWorker {
    events: mpsc::Receiver<WalkEvent>,
    cancel: CancelToken,
    task: JoinHandle<()>,
}

impl TreeWorker {
    /// Ask the walk to stop. A [`WalkEvent::Cancelled`] follows unless the
    /// walk had already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next event, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<WalkEvent> {
        self.events.recv().await
    }

    /// Drain the stream and return the final tree.
    pub async fn finish(mut self) -> Result<TreeEntry, TreeError> {
        let mut outcome = Err(TreeError::Cancelled);
        while let Some(event) = self.events.recv().await {
            match event {
                WalkEvent::Entry(_) => {}
                WalkEvent::Finished(root) => outcome = Ok(*root),
                WalkEvent::Cancelled => outcome = Err(TreeError::Cancelled),
                WalkEvent::Failed(reason) => outcome = Err(TreeError::Failed(reason)),
            }
        }
        let _ = self.task.await;
        outcome
    }
}

/// Start comparing `roots` in the background.
///
/// Must be called from within a tokio runtime.
pub fn spawn_tree_diff(roots: Vec<TreeRoot>, opts: TreeOptions, cancel: CancelToken) -> TreeWorker {
    let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
    let token = cancel.clone();

    let task = tokio::task::spawn_blocking(move || {
        let terminal = match TreeDiffer::new(&roots, &opts) {
            Ok(differ) => {
                let mut on_entry = |entry: &TreeEntry| {
                    let report = EntryReport {
                        path: entry.path.clone(),
                        state: entry.state.clone(),
                        kinds: entry.kinds.clone(),
                    };
                    // A dropped receiver means nobody is listening any more.
                    if tx.blocking_send(WalkEvent::Entry(report)).is_err() {
                        token.cancel();
                    }
                };
                match differ.run(&token, &mut on_entry) {
                    Ok(root) => WalkEvent::Finished(Box::new(root)),
                    Err(TreeError::Cancelled) => WalkEvent::Cancelled,
                    Err(e) => WalkEvent::Failed(e.to_string()),
                }
            }
            Err(e) => WalkEvent::Failed(e.to_string()),
        };
        debug!(cancelled = token.is_cancelled(), "tree worker done");
        let _ = tx.blocking_send(terminal);
    });

    TreeWorker {
        events: rx,
        cancel,
        task,
    }
}
