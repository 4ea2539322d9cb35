//! Login, logout and the "is there a session" check.

use crate::client::{ApiClient, ApiRequest, AuthMode};
use crate::error::{ClientError, Result};
use crate::models::{LoginRequest, LoginTokens};
use crate::observability::ClientEvent;
use crate::refresh::SessionSignal;
use crate::token_store::{TokenKind, TokenPair};

const LOGIN_ENDPOINT: &str = "POST /users/login/";

/// Session lifecycle operations.
#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    /// Service over `client`.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a token pair and store it.
    ///
    /// # Errors
    /// - [`ClientError::InvalidCredentials`] when the backend rejects the login.
    /// - [`ClientError::Decode`] when the response lacks either token.
    /// - Any transport or store error.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let request = ApiRequest::post("/users/login/")
            .auth(AuthMode::Public)
            .json(&LoginRequest { email, password })?;
        let response = match self.client.execute(request).await {
            Err(ClientError::Status {
                status: 400 | 401, ..
            }) => return Err(ClientError::InvalidCredentials),
            other => other?,
        };
        let tokens: LoginTokens = response.data(LOGIN_ENDPOINT)?;
        self.client.tokens().store_pair(&TokenPair {
            access_token: tokens.access_token,
            refresh_token: Some(tokens.refresh_token),
        })?;
        tracing::info!(
            event = ClientEvent::SessionLoggedIn.as_str(),
            "session established"
        );
        self.client.notify(SessionSignal::LoggedIn);
        Ok(())
    }

    /// Drop both tokens.
    ///
    /// # Errors
    /// Returns [`ClientError::TokenStore`] if the store cannot be cleared.
    pub fn logout(&self) -> Result<()> {
        self.client.tokens().clear()?;
        tracing::info!(
            event = ClientEvent::SessionLoggedOut.as_str(),
            "session cleared by logout"
        );
        self.client.notify(SessionSignal::LoggedOut);
        Ok(())
    }

    /// Whether an access token is stored (protected views require one).
    ///
    /// # Errors
    /// Returns [`ClientError::TokenStore`] if the store cannot be read.
    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.client.tokens().get(TokenKind::Access)?.is_some())
    }
}
