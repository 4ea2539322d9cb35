//! Members page: list, invite, role change and removal.

use std::sync::{Mutex, MutexGuard};

use super::{
    FetchOutcome, InFlightGuard, ItemPhase, MemberMutation, PendingConfirmation, ResourceView,
    gate, lock_view, log_mutation_result, refresh_view,
};
use crate::access::{Action, Permission, authorize};
use crate::error::Result;
use crate::forms::MemberForm;
use crate::models::{Member, MemberId, Role};
use crate::observability::ClientEvent;
use crate::services::{AdminApi, MembersService};

const RESOURCE: &str = "member";

/// Member list with role-gated, confirm-then-apply mutations.
pub struct MembersController {
    service: MembersService,
    role: Role,
    view: Mutex<ResourceView<Member, MemberMutation>>,
}

impl MembersController {
    /// Controller acting with `role`.
    #[must_use]
    pub fn new(service: MembersService, role: Role) -> Self {
        Self {
            service,
            role,
            view: Mutex::new(ResourceView::new(RESOURCE)),
        }
    }

    /// Look up the current user's role, then fetch the list.
    ///
    /// # Errors
    /// Propagates the current-user and list fetch errors.
    pub async fn load(api: &AdminApi) -> Result<Self> {
        let user = api.user.current_user().await?;
        let controller = Self::new(api.members.clone(), user.role);
        controller.refresh().await?;
        Ok(controller)
    }

    /// Role the controller gates with.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Capability check without side effects (to hide or show controls).
    #[must_use]
    pub fn can(&self, action: Action) -> Permission {
        authorize(self.role, action)
    }

    /// Fetch the list. A result overtaken by a newer fetch or a local patch is discarded.
    ///
    /// # Errors
    /// Propagates fetch errors; local state is left unchanged.
    pub async fn refresh(&self) -> Result<FetchOutcome> {
        refresh_view(&self.view, self.service.list()).await
    }

    /// Snapshot of the local list.
    #[must_use]
    pub fn items(&self) -> Vec<Member> {
        self.view().list.items().to_vec()
    }

    /// Whether the list has been fetched at least once.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.view().list.is_loaded()
    }

    /// Workflow phase of one member.
    #[must_use]
    pub fn phase(&self, id: MemberId) -> ItemPhase {
        self.view().phase(id)
    }

    /// Mutation currently awaiting confirmation.
    #[must_use]
    pub fn pending(&self) -> Option<PendingConfirmation<MemberMutation>> {
        self.view().pending().cloned()
    }

    /// Stage a role change from the member's current role to `to`.
    ///
    /// # Errors
    /// - [`crate::ClientError::PermissionDenied`] for non-admins.
    /// - [`crate::ClientError::NotFound`] if the member is not in the list.
    /// - [`crate::ClientError::MutationInFlight`] if the member is being mutated.
    pub fn request_role_change(
        &self,
        id: MemberId,
        to: Role,
    ) -> Result<PendingConfirmation<MemberMutation>> {
        gate(self.role, Action::ChangeMemberRole)?;
        self.view().stage(id, |member| MemberMutation::ChangeRole {
            from: member.role,
            to,
        })
    }

    /// Stage removal of a member.
    ///
    /// # Errors
    /// Same as [`Self::request_role_change`].
    pub fn request_remove(&self, id: MemberId) -> Result<PendingConfirmation<MemberMutation>> {
        gate(self.role, Action::RemoveMember)?;
        self.view().stage(id, |_| MemberMutation::Remove)
    }

    /// Drop the staged mutation without sending anything.
    ///
    /// # Errors
    /// [`crate::ClientError::NoPendingConfirmation`] if nothing is staged.
    pub fn cancel(&self) -> Result<PendingConfirmation<MemberMutation>> {
        self.view().cancel()
    }

    /// Send the staged mutation; patch the list only on success.
    ///
    /// # Errors
    /// - [`crate::ClientError::NoPendingConfirmation`] if nothing is staged.
    /// - [`crate::ClientError::MutationInFlight`] if the target is already in flight.
    /// - Any service error; the list is left unchanged.
    pub async fn confirm(&self) -> Result<PendingConfirmation<MemberMutation>> {
        let pending = self.view().begin_confirm(self.role)?;
        let id = pending.target_id;
        let guard = InFlightGuard::new(&self.view, id);
        let result = match pending.mutation {
            MemberMutation::ChangeRole { to, .. } => self.service.update_role(id, to).await,
            MemberMutation::Remove => self.service.remove(id).await,
        };
        log_mutation_result(RESOURCE, id, &pending.mutation, &result);
        result?;

        guard.settle(|list| match pending.mutation {
            MemberMutation::ChangeRole { to, .. } => {
                list.patch(id, |member| member.role = to);
            }
            MemberMutation::Remove => {
                list.remove(id);
            }
        });
        Ok(pending)
    }

    /// Validate and send an invite, then refetch the list.
    ///
    /// If the refetch fails the created member is added locally instead.
    ///
    /// # Errors
    /// - [`crate::ClientError::PermissionDenied`] for non-admins.
    /// - [`crate::ClientError::Validation`] for an invalid form; nothing is sent.
    /// - Any service error from the create call.
    pub async fn add_member(&self, form: &MemberForm) -> Result<Member> {
        gate(self.role, Action::AddMember)?;
        let new_member = form.validate()?;
        let result = self.service.create(&new_member).await;
        let id = result.as_ref().map_or(0, |member| member.id);
        log_mutation_result(RESOURCE, id, &"create", &result);
        let created = result?;
        if let Err(error) = self.refresh().await {
            tracing::warn!(
                event = ClientEvent::ControllerRefetchFallback.as_str(),
                resource = RESOURCE,
                id = created.id,
                error = %error,
                "refetch after invite failed; inserting member locally"
            );
            self.view().list.upsert(created.clone());
        }
        Ok(created)
    }

    fn view(&self) -> MutexGuard<'_, ResourceView<Member, MemberMutation>> {
        lock_view(&self.view)
    }
}
