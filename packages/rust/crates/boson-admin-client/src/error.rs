//! Error types for the admin API client.
//!
//! Library code uses `thiserror` for explicit error enums; resource services
//! never swallow these, they bubble up to the view controller that decides
//! what the operator sees.

use thiserror::Error;

use crate::access::Action;
use crate::forms::ValidationError;
use crate::models::Role;

/// Errors surfaced by the HTTP client, resource services and view controllers.
#[derive(Error, Debug)]
pub enum ClientError {
    /// An authenticated call was attempted with no access token stored.
    #[error("not logged in: no access token available")]
    AuthMissing,

    /// Authorization failed and one refresh attempt could not fix it.
    /// Both tokens have already been cleared.
    #[error("session expired, log in again ({reason})")]
    AuthExpired {
        /// Why the refresh protocol gave up.
        reason: RefreshFailure,
    },

    /// Login rejected by the backend.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// A form field is missing or malformed; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The client-side role gate rejected a mutation; nothing was sent.
    #[error("role '{role}' is not permitted to {action}")]
    PermissionDenied {
        /// Role of the current session.
        role: Role,
        /// Action that was attempted.
        action: Action,
    },

    /// The item already has a mutation in flight.
    #[error("item {id} already has a mutation in flight")]
    MutationInFlight {
        /// Target item id.
        id: u64,
    },

    /// Confirm or cancel was called with nothing awaiting confirmation.
    #[error("no mutation is awaiting confirmation")]
    NoPendingConfirmation,

    /// The item is not present in the locally held list.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Resource kind (`member`, `job`).
        resource: &'static str,
        /// Requested id.
        id: u64,
    },

    /// Non-success HTTP status, including a 401 that survived one retry.
    #[error("{method} {path} failed with HTTP {status}")]
    Status {
        /// Request method.
        method: String,
        /// Request path relative to the API base URL.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Raw response body (may be empty).
        body: String,
    },

    /// Transport-level failure (connect, timeout, TLS, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the endpoint's envelope.
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        /// Endpoint label, e.g. `GET /members/`.
        endpoint: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The request body could not be serialized.
    #[error("request encoding failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The persistent token store could not be read or written.
    #[error("token store: {0}")]
    TokenStore(String),
}

impl ClientError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the operator must (re)authenticate to continue.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthMissing | Self::AuthExpired { .. }) || self.status() == Some(401)
    }
}

/// Terminal outcome of a failed token refresh.
///
/// `Clone` so the single in-flight refresh can hand the same failure to every
/// queued caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// No refresh token stored; no network call was made.
    #[error("no refresh token stored")]
    MissingRefreshToken,

    /// The refresh endpoint answered with a non-success status.
    #[error("refresh rejected with HTTP {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// The refresh request never got an answer.
    #[error("refresh transport error: {0}")]
    Transport(String),

    /// The refresh response did not carry an access token.
    #[error("refresh response malformed: {0}")]
    Decode(String),

    /// The token store failed while saving or clearing tokens.
    #[error("token store: {0}")]
    Store(String),

    /// The leading refresh was cancelled before it finished.
    #[error("refresh abandoned before completion")]
    Abandoned,
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
