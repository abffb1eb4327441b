//! Monotonic generations for latest-only recomputation.
//!
//! Every computation runs under a [`Ticket`]. Starting a new ticket cancels
//! the previous one, and a result is only published while its ticket is
//! still the latest, so stale results never overwrite newer ones whatever
//! order computations finish in.

use std::sync::{Mutex, MutexGuard, PoisonError};

use weft_types::CancelToken;

/// One computation's claim on a generation.
#[derive(Clone, Debug)]
pub struct Ticket {
    generation: u64,
    cancel: CancelToken,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token cancelled once a newer ticket starts.
    pub fn token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Debug, Default)]
struct State {
    latest: u64,
    published: u64,
    running: Option<CancelToken>,
}

/// Hands out tickets and decides which results may be published.
#[derive(Debug, Default)]
pub struct Generations {
    state: Mutex<State>,
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the next generation, cancelling the one in flight.
    pub fn start(&self) -> Ticket {
        let mut state = self.lock();
        state.latest += 1;
        let cancel = CancelToken::new();
        if let Some(previous) = state.running.replace(cancel.clone()) {
            previous.cancel();
        }
        Ticket {
            generation: state.latest,
            cancel,
        }
    }

    /// The most recently started generation.
    pub fn latest(&self) -> u64 {
        self.lock().latest
    }

    /// The most recently published generation.
    pub fn published(&self) -> u64 {
        self.lock().published
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.lock().latest == ticket.generation
    }

    /// Record `ticket`'s result as published. Returns `false`, and records
    /// nothing, if a newer generation has started or been published.
    pub fn try_publish(&self, ticket: &Ticket) -> bool {
        let mut state = self.lock();
        if ticket.generation != state.latest || ticket.generation <= state.published {
            return false;
        }
        state.published = ticket.generation;
        state.running = None;
        true
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
