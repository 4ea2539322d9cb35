//! Job posting endpoints.

use crate::client::{ApiClient, ApiRequest};
use crate::error::Result;
use crate::models::{Job, JobDraft, JobId, JobStatus};

/// Typed facade over `/jobs/`.
#[derive(Clone)]
pub struct JobsService {
    client: ApiClient,
}

impl JobsService {
    /// Service over `client`.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `GET /jobs/`.
    ///
    /// # Errors
    /// Propagates client and decode errors.
    pub async fn list(&self) -> Result<Vec<Job>> {
        self.client
            .execute(ApiRequest::get("/jobs/"))
            .await?
            .data("GET /jobs/")
    }

    /// `GET /jobs/{id}/`, used to pre-fill the edit form.
    ///
    /// # Errors
    /// Propagates client and decode errors.
    pub async fn get(&self, id: JobId) -> Result<Job> {
        self.client
            .execute(ApiRequest::get(format!("/jobs/{id}/")))
            .await?
            .json("GET /jobs/{id}/")
    }

    /// `POST /jobs/`.
    ///
    /// # Errors
    /// Propagates client and decode errors.
    pub async fn create(&self, draft: &JobDraft) -> Result<Job> {
        let request = ApiRequest::post("/jobs/").json(draft)?;
        self.client.execute(request).await?.json("POST /jobs/")
    }

    /// `PUT /jobs/{id}/edit/` with the full posting.
    ///
    /// # Errors
    /// Propagates client and decode errors.
    pub async fn update(&self, job: &Job) -> Result<Job> {
        let request = ApiRequest::put(format!("/jobs/{}/edit/", job.id)).json(job)?;
        self.client
            .execute(request)
            .await?
            .json("PUT /jobs/{id}/edit/")
    }

    /// `PUT /jobs/{id}/status/{status}/`; repeating it with the same status is a no-op.
    ///
    /// # Errors
    /// Propagates client errors.
    pub async fn update_status(&self, id: JobId, status: JobStatus) -> Result<()> {
        self.client
            .execute(ApiRequest::put(format!("/jobs/{id}/status/{status}/")))
            .await?;
        Ok(())
    }

    /// `DELETE /jobs/{id}/delete/`.
    ///
    /// # Errors
    /// Propagates client errors.
    pub async fn delete(&self, id: JobId) -> Result<()> {
        self.client
            .execute(ApiRequest::delete(format!("/jobs/{id}/delete/")))
            .await?;
        Ok(())
    }
}
