//! Signed-in user lookup.

use crate::client::{ApiClient, ApiRequest};
use crate::error::Result;
use crate::models::CurrentUser;

/// `GET /users/user/`.
#[derive(Clone)]
pub struct UserService {
    client: ApiClient,
}

impl UserService {
    /// Service over `client`.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Username and role of the current session.
    ///
    /// # Errors
    /// Propagates client errors; there is no guest fallback.
    pub async fn current_user(&self) -> Result<CurrentUser> {
        self.client
            .execute(ApiRequest::get("/users/user/"))
            .await?
            .data("GET /users/user/")
    }
}
