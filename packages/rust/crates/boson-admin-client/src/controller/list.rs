//! Locally held resource list with out-of-order fetch protection.
//!
//! Every fetch takes a ticket with a monotonically increasing sequence
//! number. A completion older than the newest applied one is dropped, so
//! overlapping fetches resolve last-issued-wins regardless of arrival order.

use crate::models::Identified;

/// Sequence number handed out when a fetch is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    /// Raw sequence number.
    #[must_use]
    pub fn seq(self) -> u64 {
        self.0
    }
}

/// What happened to a fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The result replaced the local list.
    Applied,
    /// A newer fetch or local mutation already superseded it; discarded.
    Stale,
}

/// Items plus fetch bookkeeping.
#[derive(Debug, Clone)]
pub struct ListState<T> {
    items: Vec<T>,
    loaded: bool,
    issued_seq: u64,
    applied_seq: u64,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loaded: false,
            issued_seq: 0,
            applied_seq: 0,
        }
    }
}

impl<T: Identified> ListState<T> {
    /// Empty, not yet loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current items.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Whether any fetch has been applied yet.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Item by id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Issue a new fetch.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued_seq += 1;
        FetchTicket(self.issued_seq)
    }

    /// Whether `ticket` could still be applied.
    #[must_use]
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 > self.applied_seq
    }

    /// Apply a fetch result unless something newer already landed.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, items: Vec<T>) -> FetchOutcome {
        if !self.is_current(ticket) {
            return FetchOutcome::Stale;
        }
        self.items = items;
        self.loaded = true;
        self.applied_seq = ticket.0;
        FetchOutcome::Applied
    }

    /// Apply `update` to one item. Fetches issued before this call become stale.
    ///
    /// Returns `false` if the item is not present.
    pub fn patch(&mut self, id: u64, update: impl FnOnce(&mut T)) -> bool {
        self.supersede_in_flight_fetches();
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                update(item);
                true
            }
            None => false,
        }
    }

    /// Remove one item. Fetches issued before this call become stale.
    pub fn remove(&mut self, id: u64) -> Option<T> {
        self.supersede_in_flight_fetches();
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    /// Replace the item with the same id, or append it.
    pub fn upsert(&mut self, item: T) {
        self.supersede_in_flight_fetches();
        match self.items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    // A fetch issued before a local mutation landed may carry pre-mutation data.
    fn supersede_in_flight_fetches(&mut self) {
        self.applied_seq = self.issued_seq;
    }
}
