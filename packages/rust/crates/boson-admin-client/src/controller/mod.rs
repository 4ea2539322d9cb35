//! View controllers: role-gated, confirm-then-apply mutation workflows over
//! the locally held member and job lists.
//!
//! Each controller owns one list behind a mutex so fetches may overlap. A
//! mutation goes `Viewing -> PendingConfirmation -> InFlight -> Viewing`; the
//! list is only patched after the backend confirms success.

mod confirmation;
mod jobs;
mod list;
mod members;

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub use confirmation::{ItemPhase, JobMutation, MemberMutation, Mutation, PendingConfirmation};
pub use jobs::JobsController;
pub use list::{FetchOutcome, FetchTicket, ListState};
pub use members::MembersController;

use crate::access::{Action, Permission, authorize};
use crate::error::{ClientError, Result};
use crate::models::{Identified, Role};
use crate::observability::ClientEvent;

/// List plus the mutation workflow state of one resource view.
pub(crate) struct ResourceView<T, M> {
    resource: &'static str,
    pub(crate) list: ListState<T>,
    pending: Option<PendingConfirmation<M>>,
    in_flight: HashSet<u64>,
}

impl<T: Identified, M: Mutation> ResourceView<T, M> {
    pub(crate) fn new(resource: &'static str) -> Self {
        Self {
            resource,
            list: ListState::new(),
            pending: None,
            in_flight: HashSet::new(),
        }
    }

    pub(crate) fn phase(&self, id: u64) -> ItemPhase {
        if self.in_flight.contains(&id) {
            ItemPhase::InFlight
        } else if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.target_id == id)
        {
            ItemPhase::PendingConfirmation
        } else {
            ItemPhase::Viewing
        }
    }

    pub(crate) fn pending(&self) -> Option<&PendingConfirmation<M>> {
        self.pending.as_ref()
    }

    /// Stage `build(item)` for the item with `id`, replacing any earlier staging.
    pub(crate) fn stage(
        &mut self,
        id: u64,
        build: impl FnOnce(&T) -> M,
    ) -> Result<PendingConfirmation<M>> {
        if self.in_flight.contains(&id) {
            return Err(ClientError::MutationInFlight { id });
        }
        let item = self.list.get(id).ok_or(ClientError::NotFound {
            resource: self.resource,
            id,
        })?;
        let pending = PendingConfirmation {
            target_id: id,
            target_name: item.label().to_string(),
            mutation: build(item),
        };
        tracing::debug!(
            event = ClientEvent::ControllerMutationStaged.as_str(),
            resource = self.resource,
            id,
            mutation = ?pending.mutation,
            "mutation awaiting confirmation"
        );
        self.pending = Some(pending.clone());
        Ok(pending)
    }

    pub(crate) fn cancel(&mut self) -> Result<PendingConfirmation<M>> {
        self.pending.take().ok_or(ClientError::NoPendingConfirmation)
    }

    /// Move the staged mutation to in-flight. An in-flight target keeps it staged.
    pub(crate) fn begin_confirm(&mut self, role: Role) -> Result<PendingConfirmation<M>> {
        let pending = self
            .pending
            .as_ref()
            .ok_or(ClientError::NoPendingConfirmation)?;
        gate(role, pending.mutation.action())?;
        let id = pending.target_id;
        self.begin(id)?;
        self.pending.take().ok_or(ClientError::NoPendingConfirmation)
    }

    /// Mark `id` in flight for a mutation that needs no confirmation.
    pub(crate) fn begin(&mut self, id: u64) -> Result<()> {
        if self.in_flight.insert(id) {
            Ok(())
        } else {
            Err(ClientError::MutationInFlight { id })
        }
    }
}

pub(crate) fn lock_view<T, M>(
    view: &Mutex<ResourceView<T, M>>,
) -> MutexGuard<'_, ResourceView<T, M>> {
    view.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight mark when the mutation finishes or its future is dropped.
pub(crate) struct InFlightGuard<'a, T, M> {
    view: &'a Mutex<ResourceView<T, M>>,
    id: u64,
    settled: bool,
}

impl<'a, T, M> InFlightGuard<'a, T, M> {
    pub(crate) fn new(view: &'a Mutex<ResourceView<T, M>>, id: u64) -> Self {
        Self {
            view,
            id,
            settled: false,
        }
    }

    /// Apply the confirmed change to the list and clear the mark under one lock.
    pub(crate) fn settle(mut self, apply: impl FnOnce(&mut ListState<T>)) {
        let mut view = lock_view(self.view);
        apply(&mut view.list);
        view.in_flight.remove(&self.id);
        self.settled = true;
    }
}

impl<T, M> Drop for InFlightGuard<'_, T, M> {
    fn drop(&mut self) {
        if !self.settled {
            lock_view(self.view).in_flight.remove(&self.id);
        }
    }
}

/// Role gate with a structured log line on denial.
pub(crate) fn gate(role: Role, action: Action) -> Result<()> {
    let permission = authorize(role, action);
    if let Permission::Denied { .. } = permission {
        tracing::info!(
            event = ClientEvent::ControllerMutationDenied.as_str(),
            role = %role,
            action = %action,
            "mutation rejected by role gate; nothing sent"
        );
    }
    permission.require()
}

/// Issue a fetch, then apply its result unless a newer fetch or a local patch won.
pub(crate) async fn refresh_view<T, M, F>(
    view: &Mutex<ResourceView<T, M>>,
    fetch: F,
) -> Result<FetchOutcome>
where
    T: Identified,
    M: Mutation,
    F: Future<Output = Result<Vec<T>>>,
{
    let (ticket, resource) = {
        let mut guard = lock_view(view);
        (guard.list.begin_fetch(), guard.resource)
    };
    let items = fetch.await?;
    let count = items.len();
    let outcome = lock_view(view).list.complete_fetch(ticket, items);
    match outcome {
        FetchOutcome::Applied => tracing::debug!(
            event = ClientEvent::ControllerFetchApplied.as_str(),
            resource,
            ticket = ticket.seq(),
            count,
            "list refreshed"
        ),
        FetchOutcome::Stale => tracing::debug!(
            event = ClientEvent::ControllerFetchStale.as_str(),
            resource,
            ticket = ticket.seq(),
            "superseded fetch result discarded"
        ),
    }
    Ok(outcome)
}

/// Log how a confirmed mutation ended.
pub(crate) fn log_mutation_result<T>(
    resource: &'static str,
    id: u64,
    mutation: &dyn fmt::Debug,
    result: &Result<T>,
) {
    match result {
        Ok(_) => tracing::info!(
            event = ClientEvent::ControllerMutationApplied.as_str(),
            resource,
            id,
            mutation = ?mutation,
            "mutation applied"
        ),
        Err(error) => tracing::warn!(
            event = ClientEvent::ControllerMutationFailed.as_str(),
            resource,
            id,
            mutation = ?mutation,
            error = %error,
            "mutation failed; local state unchanged"
        ),
    }
}
