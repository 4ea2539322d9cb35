//! Resource services: one typed operation per backend endpoint.
//!
//! No retries or caching here beyond what [`ApiClient`] already does, and
//! errors are never swallowed.

mod auth;
mod jobs;
mod members;
mod user;

use std::sync::Arc;

pub use auth::AuthService;
pub use jobs::JobsService;
pub use members::MembersService;
pub use user::UserService;

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::token_store::TokenStore;

/// Every service sharing one client, token store and refresh coordinator.
#[derive(Clone)]
pub struct AdminApi {
    /// Underlying request pipeline.
    pub client: ApiClient,
    /// Login/logout.
    pub auth: AuthService,
    /// Current user.
    pub user: UserService,
    /// Members.
    pub members: MembersService,
    /// Job postings.
    pub jobs: JobsService,
}

impl AdminApi {
    /// Build the client and all services for `config`.
    ///
    /// # Errors
    /// Returns [`crate::ClientError::Network`] if the HTTP client cannot be built.
    pub fn connect(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        Ok(Self::from_client(ApiClient::new(config, tokens)?))
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn from_client(client: ApiClient) -> Self {
        Self {
            auth: AuthService::new(client.clone()),
            user: UserService::new(client.clone()),
            members: MembersService::new(client.clone()),
            jobs: JobsService::new(client.clone()),
            client,
        }
    }
}
