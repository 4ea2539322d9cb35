//! Careers page plus the add/edit posting flows.

use std::sync::{Mutex, MutexGuard};

use super::{
    FetchOutcome, InFlightGuard, ItemPhase, JobMutation, PendingConfirmation, ResourceView, gate,
    lock_view, log_mutation_result, refresh_view,
};
use crate::access::{Action, Permission, authorize};
use crate::error::Result;
use crate::forms::{CategoryCatalog, JobForm};
use crate::models::{Job, JobId, JobStatus, Role};
use crate::observability::ClientEvent;
use crate::services::{AdminApi, JobsService};

const RESOURCE: &str = "job";

/// Job posting list with role-gated mutations.
pub struct JobsController {
    service: JobsService,
    role: Role,
    view: Mutex<ResourceView<Job, JobMutation>>,
}

impl JobsController {
    /// Controller acting with `role`.
    #[must_use]
    pub fn new(service: JobsService, role: Role) -> Self {
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
        let controller = Self::new(api.jobs.clone(), user.role);
        controller.refresh().await?;
        Ok(controller)
    }

    /// Role the controller gates with.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Capability check without side effects.
    #[must_use]
    pub fn can(&self, action: Action) -> Permission {
        authorize(self.role, action)
    }

    /// Fetch the list; superseded results are discarded.
    ///
    /// # Errors
    /// Propagates fetch errors; local state is left unchanged.
    pub async fn refresh(&self) -> Result<FetchOutcome> {
        refresh_view(&self.view, self.service.list()).await
    }

    /// Snapshot of the local list.
    #[must_use]
    pub fn items(&self) -> Vec<Job> {
        self.view().list.items().to_vec()
    }

    /// Whether the list has been fetched at least once.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.view().list.is_loaded()
    }

    /// Workflow phase of one posting.
    #[must_use]
    pub fn phase(&self, id: JobId) -> ItemPhase {
        self.view().phase(id)
    }

    /// Mutation currently awaiting confirmation.
    #[must_use]
    pub fn pending(&self) -> Option<PendingConfirmation<JobMutation>> {
        self.view().pending().cloned()
    }

    /// Default categories plus any category used by a loaded posting.
    #[must_use]
    pub fn categories(&self) -> CategoryCatalog {
        let mut catalog = CategoryCatalog::default();
        for job in self.view().list.items() {
            // Blank categories from the backend are skipped.
            let _ = catalog.add(&job.draft.category);
        }
        catalog
    }

    /// Stage a status change from the posting's current status to `to`.
    ///
    /// # Errors
    /// - [`crate::ClientError::PermissionDenied`] for viewers.
    /// - [`crate::ClientError::NotFound`] if the posting is not in the list.
    /// - [`crate::ClientError::MutationInFlight`] if the posting is being mutated.
    pub fn request_status_change(
        &self,
        id: JobId,
        to: JobStatus,
    ) -> Result<PendingConfirmation<JobMutation>> {
        gate(self.role, Action::ChangeJobStatus)?;
        self.view().stage(id, |job| JobMutation::ChangeStatus {
            from: job.draft.status,
            to,
        })
    }

    /// Stage deletion of a posting.
    ///
    /// # Errors
    /// Same as [`Self::request_status_change`].
    pub fn request_delete(&self, id: JobId) -> Result<PendingConfirmation<JobMutation>> {
        gate(self.role, Action::DeleteJob)?;
        self.view().stage(id, |_| JobMutation::Delete)
    }

    /// Drop the staged mutation without sending anything.
    ///
    /// # Errors
    /// [`crate::ClientError::NoPendingConfirmation`] if nothing is staged.
    pub fn cancel(&self) -> Result<PendingConfirmation<JobMutation>> {
        self.view().cancel()
    }

    /// Send the staged mutation; patch the list only on success.
    ///
    /// # Errors
    /// - [`crate::ClientError::NoPendingConfirmation`] if nothing is staged.
    /// - [`crate::ClientError::MutationInFlight`] if the target is already in flight.
    /// - Any service error; the list is left unchanged.
    pub async fn confirm(&self) -> Result<PendingConfirmation<JobMutation>> {
        let pending = self.view().begin_confirm(self.role)?;
        let id = pending.target_id;
        let guard = InFlightGuard::new(&self.view, id);
        let result = match pending.mutation {
            JobMutation::ChangeStatus { to, .. } => self.service.update_status(id, to).await,
            JobMutation::Delete => self.service.delete(id).await,
        };
        log_mutation_result(RESOURCE, id, &pending.mutation, &result);
        result?;

        guard.settle(|list| match pending.mutation {
            JobMutation::ChangeStatus { to, .. } => {
                list.patch(id, |job| job.draft.status = to);
            }
            JobMutation::Delete => {
                list.remove(id);
            }
        });
        Ok(pending)
    }

    /// Validate `form`, create the posting with `status`, then refetch the list.
    ///
    /// If the refetch fails the created posting is added locally instead.
    ///
    /// # Errors
    /// - [`crate::ClientError::PermissionDenied`] for viewers.
    /// - [`crate::ClientError::Validation`] for an invalid form; nothing is sent.
    /// - Any service error from the create call.
    pub async fn add_job(&self, form: &JobForm, status: JobStatus) -> Result<Job> {
        gate(self.role, Action::AddJob)?;
        let draft = form.validate_as(status)?;
        let result = self.service.create(&draft).await;
        let id = result.as_ref().map_or(0, |job| job.id);
        log_mutation_result(RESOURCE, id, &"create", &result);
        let created = result?;
        if let Err(error) = self.refresh().await {
            tracing::warn!(
                event = ClientEvent::ControllerRefetchFallback.as_str(),
                resource = RESOURCE,
                id = created.id,
                error = %error,
                "refetch after create failed; inserting posting locally"
            );
            self.view().list.upsert(created.clone());
        }
        Ok(created)
    }

    /// Fetch one posting from the backend and turn it into an edit form.
    ///
    /// # Errors
    /// - [`crate::ClientError::PermissionDenied`] for viewers.
    /// - Any service error from `GET /jobs/{id}/`.
    pub async fn load_for_edit(&self, id: JobId) -> Result<JobForm> {
        gate(self.role, Action::EditJob)?;
        let job = self.service.get(id).await?;
        Ok(JobForm::from_job(&job))
    }

    /// Validate `form` and replace posting `id` with it.
    ///
    /// # Errors
    /// - [`crate::ClientError::PermissionDenied`] for viewers.
    /// - [`crate::ClientError::Validation`] for an invalid form; nothing is sent.
    /// - [`crate::ClientError::MutationInFlight`] if the posting is being mutated.
    /// - Any service error; the list is left unchanged.
    pub async fn save_edit(&self, id: JobId, form: &JobForm) -> Result<Job> {
        gate(self.role, Action::EditJob)?;
        let draft = form.validate()?;
        self.view().begin(id)?;
        let guard = InFlightGuard::new(&self.view, id);
        let result = self.service.update(&Job { id, draft }).await;
        log_mutation_result(RESOURCE, id, &"edit", &result);
        let updated = result?;
        guard.settle(|list| list.upsert(updated.clone()));
        Ok(updated)
    }

    fn view(&self) -> MutexGuard<'_, ResourceView<Job, JobMutation>> {
        lock_view(&self.view)
    }
}
