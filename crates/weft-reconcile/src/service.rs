//! Latest-only background reconciliation of a live pair.
//!
//! Edits are submitted over a channel. Each one starts a new generation and
//! a recompute on the blocking pool; the previous recompute is cancelled.
//! Only results of the latest generation reach the `watch` channel.

use std::ops::Range;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use weft_diff::{DiffError, TextDiffer};
use weft_types::{ChunkList, DiffOptions, Sequence, Side};

use crate::edit::Edit;
use crate::error::{ReconcileError, ReconcileResult};
use crate::generation::{Generations, Ticket};
use crate::pair::reconcile_with;

/// Capacity of the edit queue.
const QUEUE_CAPACITY: usize = 64;

/// A published state: both sequences and their chunk list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub generation: u64,
    pub a: Sequence,
    pub b: Sequence,
    pub chunks: ChunkList,
    /// Chunk indices recomputed since the previous snapshot.
    pub invalidated: Range<usize>,
}

#[derive(Debug)]
struct Submitted {
    edit: Edit,
    updated: Sequence,
}

/// Handle to a running reconcile service.
#[derive(Debug)]
pub struct ReconcileService {
    edits: mpsc::Sender<Submitted>,
    snapshots: watch::Receiver<Snapshot>,
    generations: Arc<Generations>,
    task: JoinHandle<()>,
}

impl ReconcileService {
    /// Diff `a` and `b` and start serving edits. Must be called from within
    /// a tokio runtime.
    pub fn spawn(a: Sequence, b: Sequence, opts: &DiffOptions) -> ReconcileResult<Self> {
        let differ = Arc::new(TextDiffer::new(opts)?);
        let chunks = differ.diff(a.lines(), b.lines());
        let initial = Snapshot {
            generation: 0,
            invalidated: 0..chunks.len(),
            a,
            b,
            chunks,
        };
        let (edits, queue) = mpsc::channel(QUEUE_CAPACITY);
        let (publish, snapshots) = watch::channel(initial.clone());
        let generations = Arc::new(Generations::new());

        let worker = Worker {
            differ,
            generations: generations.clone(),
            a: initial.a.clone(),
            b: initial.b.clone(),
            base: initial,
            pending: Vec::new(),
        };
        let task = tokio::spawn(worker.run(queue, publish));
        Ok(Self {
            edits,
            snapshots,
            generations,
            task,
        })
    }

    /// Queue an edit already made to `updated`, the new version of
    /// `edit.side`.
    pub async fn submit(&self, edit: Edit, updated: Sequence) -> ReconcileResult<()> {
        self.edits
            .send(Submitted { edit, updated })
            .await
            .map_err(|_| ReconcileError::Closed)
    }

    /// A receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// The last published snapshot.
    pub fn latest(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn generations(&self) -> &Generations {
        &self.generations
    }

    /// Stop accepting edits and wait for the service to drain.
    pub async fn shutdown(self) {
        drop(self.edits);
        let _ = self.task.await;
    }
}

struct Worker {
    differ: Arc<TextDiffer>,
    generations: Arc<Generations>,
    a: Sequence,
    b: Sequence,
    /// Last published state; `pending` edits lead from it to `a` and `b`.
    base: Snapshot,
    pending: Vec<Edit>,
}

type Outcome = (Ticket, ReconcileResult<Snapshot>);

impl Worker {
    async fn run(mut self, mut queue: mpsc::Receiver<Submitted>, publish: watch::Sender<Snapshot>) {
        let (done_tx, mut done_rx) = mpsc::channel::<Outcome>(QUEUE_CAPACITY);
        let mut in_flight = 0usize;
        let mut open = true;

        while open || in_flight > 0 {
            tokio::select! {
                submitted = queue.recv(), if open => match submitted {
                    Some(submitted) => {
                        if self.accept(submitted) {
                            self.dispatch(done_tx.clone());
                            in_flight += 1;
                        }
                    }
                    None => open = false,
                },
                Some((ticket, outcome)) = done_rx.recv() => {
                    in_flight -= 1;
                    self.complete(&ticket, outcome, &publish);
                }
            }
        }
        debug!(published = self.generations.published(), "reconcile service stopped");
    }

    fn accept(&mut self, submitted: Submitted) -> bool {
        let Submitted { edit, updated } = submitted;
        let current = match edit.side {
            Side::A => &self.a,
            Side::B => &self.b,
        };
        if updated.version() <= current.version() {
            warn!(
                side = ?edit.side,
                current = current.version(),
                got = updated.version(),
                "ignoring stale edit"
            );
            return false;
        }
        match edit.side {
            Side::A => self.a = updated,
            Side::B => self.b = updated,
        }
        self.pending.push(edit);
        true
    }

    fn dispatch(&self, done: mpsc::Sender<Outcome>) {
        let ticket = self.generations.start();
        let job = Job {
            differ: self.differ.clone(),
            base: self.base.chunks.clone(),
            a: self.a.clone(),
            b: self.b.clone(),
            pending: self.pending.clone(),
        };
        tokio::task::spawn_blocking(move || {
            let outcome = job.run(&ticket);
            let _ = done.blocking_send((ticket, outcome));
        });
    }

    fn complete(&mut self, ticket: &Ticket, outcome: ReconcileResult<Snapshot>, publish: &watch::Sender<Snapshot>) {
        match outcome {
            Ok(snapshot) if self.generations.try_publish(ticket) => {
                debug!(
                    generation = snapshot.generation,
                    chunks = snapshot.chunks.len(),
                    "publishing reconciled chunks"
                );
                self.pending.clear();
                self.base = snapshot.clone();
                publish.send_replace(snapshot);
            }
            Ok(_) | Err(ReconcileError::Superseded) => {
                debug!(generation = ticket.generation(), "discarding stale result");
            }
            Err(e) => warn!(generation = ticket.generation(), error = %e, "reconcile failed"),
        }
    }
}

/// A recompute against a private snapshot of the sequences.
struct Job {
    differ: Arc<TextDiffer>,
    base: ChunkList,
    a: Sequence,
    b: Sequence,
    pending: Vec<Edit>,
}

impl Job {
    fn run(&self, ticket: &Ticket) -> ReconcileResult<Snapshot> {
        let (chunks, invalidated) = match self.pending.as_slice() {
            [edit] => {
                let reconciled = reconcile_with(
                    &self.differ,
                    edit,
                    &self.base,
                    self.a.lines(),
                    self.b.lines(),
                    Some(ticket.token()),
                )?;
                (reconciled.chunks, reconciled.invalidated)
            }
            // Several edits since the last publish: start over.
            _ => {
                let chunks = self
                    .differ
                    .diff_cancellable(self.a.lines(), self.b.lines(), ticket.token())
                    .map_err(|e| match e {
                        DiffError::Cancelled => ReconcileError::Superseded,
                        other => other.into(),
                    })?;
                let len = chunks.len();
                (chunks, 0..len)
            }
        };
        Ok(Snapshot {
            generation: ticket.generation(),
            a: self.a.clone(),
            b: self.b.clone(),
            chunks: chunks.with_generation(ticket.generation()),
            invalidated,
        })
    }
}
