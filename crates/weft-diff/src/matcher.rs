//! Greedy longest-contiguous-match sequence matcher.
//!
//! Finds the longest run of equal elements within a window, then recurses
//! into the windows left and right of it. Recursion runs on an explicit work
//! stack so deeply fragmented inputs cannot overflow the call stack.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use weft_types::{CancelToken, MatchBlock, MatchLimits};

use crate::error::{DiffError, DiffResult};

/// Elements of `b` are considered popular past this many occurrences per
/// hundred, once `b` has at least [`AUTOJUNK_MIN_LEN`] elements.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Steps between wall-clock and cancellation checks.
const CHECK_INTERVAL: u64 = 4096;

/// Work accounting for one matching run.
///
/// Every probe of the inner loop costs one step. The deadline and the cancel
/// token are polled every few thousand steps.
#[derive(Debug)]
pub struct Budget<'c> {
    steps: u64,
    max_steps: Option<u64>,
    deadline: Option<Instant>,
    cancel: Option<&'c CancelToken>,
    next_check: u64,
}

impl<'c> Budget<'c> {
    pub fn new(limits: &MatchLimits, cancel: Option<&'c CancelToken>) -> Self {
        Self {
            steps: 0,
            max_steps: limits.max_steps,
            deadline: limits.timeout().map(|t| Instant::now() + t),
            cancel,
            next_check: CHECK_INTERVAL,
        }
    }

    /// A budget that never runs out and cannot be cancelled.
    pub fn unbounded() -> Self {
        Self::new(&MatchLimits::unbounded(), None)
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Spend `n` steps.
    pub fn charge(&mut self, n: u64) -> DiffResult<()> {
        self.steps = self.steps.saturating_add(n);
        if let Some(max) = self.max_steps {
            if self.steps > max {
                return Err(DiffError::ResourceExhausted { steps: self.steps });
            }
        }
        if self.steps >= self.next_check {
            self.next_check = self.steps + CHECK_INTERVAL;
            self.poll()?;
        }
        Ok(())
    }

    /// Check the deadline and the cancel token without spending steps.
    pub fn poll(&self) -> DiffResult<()> {
        if self.cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(DiffError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(DiffError::ResourceExhausted { steps: self.steps });
        }
        Ok(())
    }
}

/// Greedy matcher between two slices.
///
/// Equality is element equality; callers that need normalised comparison
/// map their input to keys first.
pub struct SequenceMatcher<'s, T> {
    a: &'s [T],
    b: &'s [T],
    b2j: HashMap<&'s T, Vec<usize>>,
    popular: usize,
}

impl<'s, T: Hash + Eq> SequenceMatcher<'s, T> {
    /// Index `b` for matching. With `autojunk`, elements making up more than
    /// one percent of a long `b` are left out of the index; they can still
    /// join a match by extension around a non-popular anchor.
    pub fn new(a: &'s [T], b: &'s [T], autojunk: bool) -> Self {
        let mut b2j: HashMap<&'s T, Vec<usize>> = HashMap::new();
        for (j, elt) in b.iter().enumerate() {
            b2j.entry(elt).or_default().push(j);
        }

        let mut popular = 0;
        let n = b.len();
        if autojunk && n >= AUTOJUNK_MIN_LEN {
            let threshold = n / 100 + 1;
            b2j.retain(|_, indices| {
                let keep = indices.len() <= threshold;
                if !keep {
                    popular += 1;
                }
                keep
            });
        }

        Self { a, b, b2j, popular }
    }

    /// Number of distinct elements dropped from the index as popular.
    pub fn popular_count(&self) -> usize {
        self.popular
    }

    /// Longest matching block in `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Ties go to the block starting earliest in `a`, then earliest in `b`.
    /// Returns a zero-length block at `(alo, blo)` when nothing matches.
    pub fn find_longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
        budget: &mut Budget<'_>,
    ) -> DiffResult<MatchBlock> {
        let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0usize);

        // j2len[j] is the length of the longest match ending at a[i-1], b[j].
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        let mut next_j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            next_j2len.clear();
            if let Some(indices) = self.b2j.get(&self.a[i]) {
                let start = indices.partition_point(|&j| j < blo);
                for &j in &indices[start..] {
                    if j >= bhi {
                        break;
                    }
                    budget.charge(1)?;
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_j2len.insert(j, k);
                    if k > best_len {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_len = k;
                    }
                }
            } else {
                budget.charge(1)?;
            }
            std::mem::swap(&mut j2len, &mut next_j2len);
        }

        // Grow the block over elements left out of the index.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_len += 1;
        }
        while best_i + best_len < ahi
            && best_j + best_len < bhi
            && self.a[best_i + best_len] == self.b[best_j + best_len]
        {
            best_len += 1;
        }

        Ok(MatchBlock::new(best_i, best_j, best_len))
    }

    /// All matching blocks, ascending, adjacent blocks merged, terminated by
    /// the `(len_a, len_b, 0)` sentinel.
    pub fn matching_blocks(&self, budget: &mut Budget<'_>) -> DiffResult<Vec<MatchBlock>> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut found = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            budget.poll()?;
            let m = self.find_longest_match(alo, ahi, blo, bhi, budget)?;
            if m.len == 0 {
                continue;
            }
            found.push(m);
            if alo < m.a && blo < m.b {
                queue.push((alo, m.a, blo, m.b));
            }
            if m.a + m.len < ahi && m.b + m.len < bhi {
                queue.push((m.a + m.len, ahi, m.b + m.len, bhi));
            }
        }
        found.sort_unstable_by_key(|m| (m.a, m.b));

        let mut blocks: Vec<MatchBlock> = Vec::with_capacity(found.len() + 1);
        for m in found {
            match blocks.last_mut() {
                Some(last) if last.a + last.len == m.a && last.b + last.len == m.b => {
                    last.len += m.len;
                }
                _ => blocks.push(m),
            }
        }
        blocks.push(MatchBlock::sentinel(la, lb));
        Ok(blocks)
    }
}
