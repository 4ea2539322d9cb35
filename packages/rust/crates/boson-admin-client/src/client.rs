//! Authenticated request pipeline.
//!
//! **Protocol:**
//! 1. Attach `Authorization: Bearer <access token>` when one is stored.
//! 2. On HTTP 401, if the request has not been retried yet: mark it retried,
//!    ask the [`RefreshCoordinator`] for a new token, resubmit the original
//!    request verbatim (same method, path, body) with the new token.
//! 3. If the refresh fails the caller gets [`ClientError::AuthExpired`]; a
//!    second 401 after a successful refresh is returned as-is. No loops.
//!
//! Any other status or transport error propagates unchanged.

use std::sync::Arc;
use std::time::Instant;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::models::DataEnvelope;
use crate::observability::ClientEvent;
use crate::refresh::{HttpRefreshBackend, RefreshBackend, RefreshCoordinator, SessionSignal};
use crate::token_store::{TokenKind, TokenStore};

/// How a request relates to the stored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Needs an access token; fails with [`ClientError::AuthMissing`] without one.
    Required,
    /// Attaches the access token when present, otherwise goes out unauthenticated.
    IfPresent,
    /// Never attaches a token and never refreshes (login, refresh).
    Public,
}

/// One logical request; resubmitted verbatim on the refresh retry.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    auth: AuthMode,
    retried: bool,
}

impl ApiRequest {
    /// Authenticated request with no body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            auth: AuthMode::Required,
            retried: false,
        }
    }

    /// `GET path`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST path`.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT path`.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `DELETE path`.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    /// Returns [`ClientError::Encode`] if `body` cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body).map_err(ClientError::Encode)?);
        Ok(self)
    }

    /// Override the auth mode.
    #[must_use]
    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the API root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// JSON body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Auth mode.
    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        self.auth
    }

    /// Whether the one allowed refresh-retry has been spent.
    #[must_use]
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// `METHOD path`, used in logs and decode errors.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Successful (2xx) response with its raw body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: u16,
    body: Vec<u8>,
}

impl ApiResponse {
    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decode the body as `T`.
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|source| ClientError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    /// Decode a `{ "data": T }` envelope and unwrap it.
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] if the envelope or payload does not match.
    pub fn data<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.json::<DataEnvelope<T>>(endpoint)
            .map(|envelope| envelope.data)
    }
}

struct ClientInner {
    config: ClientConfig,
    http: reqwest::Client,
    tokens: Arc<dyn TokenStore>,
    refresh: Arc<RefreshCoordinator>,
}

/// Configured request pipeline shared by every resource service.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Client for `config`, refreshing through `POST /users/refresh/`.
    ///
    /// # Errors
    /// Returns [`ClientError::Network`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let http = config.build_http_client()?;
        let backend = Arc::new(HttpRefreshBackend::with_client(http.clone(), &config));
        Ok(Self::from_parts(config, http, tokens, backend))
    }

    /// Client with a custom refresh backend.
    ///
    /// # Errors
    /// Returns [`ClientError::Network`] if the HTTP client cannot be built.
    pub fn with_refresh_backend(
        config: ClientConfig,
        tokens: Arc<dyn TokenStore>,
        backend: Arc<dyn RefreshBackend>,
    ) -> Result<Self> {
        let http = config.build_http_client()?;
        Ok(Self::from_parts(config, http, tokens, backend))
    }

    fn from_parts(
        config: ClientConfig,
        http: reqwest::Client,
        tokens: Arc<dyn TokenStore>,
        backend: Arc<dyn RefreshBackend>,
    ) -> Self {
        let refresh = Arc::new(RefreshCoordinator::new(Arc::clone(&tokens), backend));
        Self {
            inner: Arc::new(ClientInner {
                config,
                http,
                tokens,
                refresh,
            }),
        }
    }

    /// Connection settings.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Session token store.
    #[must_use]
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.inner.tokens
    }

    /// The single refresh coordinator for this client.
    #[must_use]
    pub fn refresh_coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.inner.refresh
    }

    /// Receive session lifecycle signals (login, logout, expiry).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.inner.refresh.subscribe()
    }

    pub(crate) fn notify(&self, signal: SessionSignal) {
        self.inner.refresh.notify(signal);
    }

    /// Send `request`, applying the bearer token and the refresh-once protocol.
    ///
    /// # Errors
    /// - [`ClientError::AuthMissing`] for a [`AuthMode::Required`] request with no token.
    /// - [`ClientError::AuthExpired`] when the 401-triggered refresh fails.
    /// - [`ClientError::Status`] for any other non-2xx (including a repeated 401).
    /// - [`ClientError::Network`] for transport failures.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        let mut token = match request.auth {
            AuthMode::Public => None,
            AuthMode::Required | AuthMode::IfPresent => {
                self.inner.tokens.get(TokenKind::Access)?
            }
        };
        if request.auth == AuthMode::Required && token.is_none() {
            tracing::debug!(
                event = ClientEvent::HttpAuthMissing.as_str(),
                request = %request.label(),
                "no access token; request not sent"
            );
            return Err(ClientError::AuthMissing);
        }

        loop {
            let (status, body) = self.send_once(&request, token.as_deref()).await?;
            if (200..300).contains(&status) {
                return Ok(ApiResponse { status, body });
            }
            if status != 401 || request.auth == AuthMode::Public {
                return Err(status_error(&request, status, body));
            }
            if request.retried {
                tracing::warn!(
                    event = ClientEvent::HttpRetryRejected.as_str(),
                    request = %request.label(),
                    "request rejected again after token refresh"
                );
                return Err(status_error(&request, status, body));
            }
            request.retried = true;
            match self.inner.refresh.refresh(token.as_deref()).await {
                Ok(fresh) => {
                    tracing::debug!(
                        event = ClientEvent::HttpRetryAfterRefresh.as_str(),
                        request = %request.label(),
                        "resubmitting request with refreshed token"
                    );
                    token = Some(fresh);
                }
                Err(reason) => return Err(ClientError::AuthExpired { reason }),
            }
        }
    }

    async fn send_once(&self, request: &ApiRequest, token: Option<&str>) -> Result<(u16, Vec<u8>)> {
        let started = Instant::now();
        let url = self.inner.config.url_for(&request.path);
        let mut builder = self.inner.http.request(request.method.clone(), &url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.json(body);
        }
        let response = match builder.send().await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(
                    event = ClientEvent::HttpRequestFailed.as_str(),
                    request = %request.label(),
                    elapsed_ms = started.elapsed().as_millis(),
                    error = %error,
                    "request failed before a response arrived"
                );
                return Err(ClientError::Network(error));
            }
        };
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        tracing::debug!(
            event = ClientEvent::HttpRequestCompleted.as_str(),
            request = %request.label(),
            status,
            retried = request.retried,
            authenticated = token.is_some(),
            elapsed_ms = started.elapsed().as_millis(),
            "request completed"
        );
        Ok((status, body))
    }
}

fn status_error(request: &ApiRequest, status: u16, body: Vec<u8>) -> ClientError {
    ClientError::Status {
        method: request.method.to_string(),
        path: request.path.clone(),
        status,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}
