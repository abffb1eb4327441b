//! Windowed re-diffing of a two-way chunk list.
//!
//! An edit only re-runs the matcher over the chunks it touches plus one
//! chunk of padding on each side. Chunks before the window are kept as they
//! are; chunks after it are shifted by the edit's length delta.

use std::ops::Range;

use tracing::debug;
use weft_diff::{coalesce, DiffError, TextDiffer};
use weft_types::{CancelToken, Chunk, ChunkList, ChunkTag, DiffOptions, Sequence, Side};

use crate::edit::{touches, Edit};
use crate::error::{ReconcileError, ReconcileResult};

/// A reconciled chunk list and the index range of chunks that were
/// recomputed. Chunks outside `invalidated` equal the prior list's chunks,
/// shifted on the edited side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciled {
    pub chunks: ChunkList,
    pub invalidated: Range<usize>,
}

/// Bring `prior`, computed before `edit`, up to date with the edited
/// sequences `a` and `b`.
pub fn reconcile(
    edit: &Edit,
    prior: &ChunkList,
    a: &Sequence,
    b: &Sequence,
    opts: &DiffOptions,
) -> ReconcileResult<Reconciled> {
    let differ = TextDiffer::new(opts)?;
    reconcile_with(&differ, edit, prior, a.lines(), b.lines(), None)
}

/// [`reconcile`] with an existing differ. With a token, a cancelled
/// computation fails with [`ReconcileError::Superseded`].
pub fn reconcile_with(
    differ: &TextDiffer,
    edit: &Edit,
    prior: &ChunkList,
    a: &[String],
    b: &[String],
    cancel: Option<&CancelToken>,
) -> ReconcileResult<Reconciled> {
    check_edit(edit, prior, a.len(), b.len())?;
    if cancel.is_some_and(CancelToken::is_cancelled) {
        return Err(ReconcileError::Superseded);
    }

    let side = edit.side;
    let delta = edit.delta();
    let chunks = prior.chunks();
    let touched = touched(chunks, side, &edit.old_range());
    let lo = touched.start.saturating_sub(1);
    let hi = (touched.end + 1).min(chunks.len());

    let (mut win_a, mut win_b) = if lo < hi {
        (
            chunks[lo].a.start..chunks[hi - 1].a.end,
            chunks[lo].b.start..chunks[hi - 1].b.end,
        )
    } else {
        (0..prior.len_a(), 0..prior.len_b())
    };
    match side {
        Side::A => win_a.end = win_a.end.saturating_add_signed(delta),
        Side::B => win_b.end = win_b.end.saturating_add_signed(delta),
    }

    let window = match cancel {
        Some(token) => differ
            .diff_cancellable(&a[win_a.clone()], &b[win_b.clone()], token)
            .map_err(|e| match e {
                DiffError::Cancelled => ReconcileError::Superseded,
                other => other.into(),
            })?,
        None => differ.diff(&a[win_a.clone()], &b[win_b.clone()]),
    };
    let fresh = window
        .into_chunks()
        .into_iter()
        .map(|c| c.shifted(win_a.start as isize, win_b.start as isize));

    let mut out: Vec<Chunk> = chunks[..lo].to_vec();
    let before = out.pop();
    let mut suffix = chunks[hi..].iter().map(|c| c.shifted_on(side, delta));
    let after = suffix.next();

    // Neighbours on either side may merge into the window at the seams.
    let joined = coalesce(before.clone().into_iter().chain(fresh).chain(after.clone()));
    let kept_before = before.is_some() && joined.first() == before.as_ref();
    let kept_after = after.is_some() && joined.last() == after.as_ref();
    let start = out.len() + usize::from(kept_before);
    out.extend(joined);
    let end = out.len() - usize::from(kept_after);
    out.extend(suffix);

    let invalidated = if out.is_empty() {
        out.push(Chunk::new(ChunkTag::Equal, 0..0, 0..0));
        0..1
    } else {
        start..end.max(start)
    };

    let list = ChunkList::new(out, a.len(), b.len()).with_generation(prior.generation() + 1);
    debug_assert!(list.validate().is_ok(), "reconciled chunks must partition both sides");
    debug!(
        side = ?side,
        start = edit.start,
        delta,
        window = hi - lo,
        invalidated = ?invalidated,
        chunks = list.len(),
        "chunks reconciled"
    );
    Ok(Reconciled {
        chunks: list,
        invalidated,
    })
}

fn check_edit(edit: &Edit, prior: &ChunkList, len_a: usize, len_b: usize) -> ReconcileResult<()> {
    let (old_len, new_len, other_old, other_new) = match edit.side {
        Side::A => (prior.len_a(), len_a, prior.len_b(), len_b),
        Side::B => (prior.len_b(), len_b, prior.len_a(), len_a),
    };
    let span = edit.old_range();
    if span.end > old_len {
        return Err(ReconcileError::EditOutOfBounds {
            start: span.start,
            end: span.end,
            len: old_len,
        });
    }
    let expected = old_len - edit.removed + edit.inserted;
    if new_len != expected {
        return Err(ReconcileError::LengthMismatch {
            expected,
            actual: new_len,
        });
    }
    if other_new != other_old {
        return Err(ReconcileError::LengthMismatch {
            expected: other_old,
            actual: other_new,
        });
    }
    Ok(())
}

/// Indices of the chunks whose range on `side` touches `span`.
fn touched(chunks: &[Chunk], side: Side, span: &Range<usize>) -> Range<usize> {
    let hit = |c: &Chunk| touches(c.range(side), span);
    match (chunks.iter().position(hit), chunks.iter().rposition(hit)) {
        (Some(first), Some(last)) => first..last + 1,
        _ => 0..chunks.len(),
    }
}

/// Two live sequences and their chunk list, kept current edit by edit.
#[derive(Clone, Debug)]
pub struct PairReconciler {
    a: Sequence,
    b: Sequence,
    chunks: ChunkList,
    differ: TextDiffer,
}

impl PairReconciler {
    pub fn new(a: Sequence, b: Sequence, opts: &DiffOptions) -> ReconcileResult<Self> {
        let differ = TextDiffer::new(opts)?;
        let chunks = differ.diff(a.lines(), b.lines());
        Ok(Self {
            a,
            b,
            chunks,
            differ,
        })
    }

    pub fn sequence(&self, side: Side) -> &Sequence {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    /// The current chunk list. Callers should fetch it again after every
    /// edit; earlier lists are never updated.
    pub fn chunks(&self) -> &ChunkList {
        &self.chunks
    }

    /// Apply an edit already made to `updated`, the new version of
    /// `edit.side`. Returns the invalidated chunk index range.
    pub fn apply_edit(&mut self, edit: &Edit, updated: Sequence) -> ReconcileResult<Range<usize>> {
        let current = self.sequence(edit.side).version();
        if updated.version() <= current {
            return Err(ReconcileError::StaleVersion {
                current,
                got: updated.version(),
            });
        }
        let (a, b) = match edit.side {
            Side::A => (&updated, &self.b),
            Side::B => (&self.a, &updated),
        };
        let reconciled = reconcile_with(&self.differ, edit, &self.chunks, a.lines(), b.lines(), None)?;
        match edit.side {
            Side::A => self.a = updated,
            Side::B => self.b = updated,
        }
        self.chunks = reconciled.chunks;
        Ok(reconciled.invalidated)
    }

    /// Replace `range` of one side with `lines` and reconcile.
    pub fn replace(
        &mut self,
        side: Side,
        range: Range<usize>,
        lines: Vec<String>,
    ) -> ReconcileResult<Range<usize>> {
        let edit = Edit::new(side, range.start, range.len(), lines.len());
        let len = self.sequence(side).len();
        let updated = self
            .sequence(side)
            .splice(range.clone(), lines)
            .map_err(|_| ReconcileError::EditOutOfBounds {
                start: range.start,
                end: range.end,
                len,
            })?;
        self.apply_edit(&edit, updated)
    }

    /// Throw the chunk list away and diff both sequences from scratch.
    pub fn rediff(&mut self) -> &ChunkList {
        let generation = self.chunks.generation() + 1;
        self.chunks = self
            .differ
            .diff(self.a.lines(), self.b.lines())
            .with_generation(generation);
        &self.chunks
    }
}
