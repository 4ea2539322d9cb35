//! Authenticated API access for the Boson admin console.
//!
//! Layers, bottom up:
//! - [`TokenStore`]: where the access/refresh pair lives between calls.
//! - [`RefreshCoordinator`]: at most one refresh in flight; concurrent callers share its result.
//! - [`ApiClient`]: bearer auth plus the retry-once-after-refresh protocol on HTTP 401.
//! - Resource services ([`AuthService`], [`UserService`], [`MembersService`], [`JobsService`]).
//! - View controllers ([`MembersController`], [`JobsController`]): role-gated,
//!   confirm-then-apply mutation workflows over locally held lists.

mod access;
mod client;
mod config;
mod controller;
mod error;
mod forms;
mod models;
mod observability;
mod refresh;
mod services;
mod token_store;

pub use access::{Action, Permission, authorize};
pub use client::{ApiClient, ApiRequest, ApiResponse, AuthMode};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use controller::{
    FetchOutcome, FetchTicket, ItemPhase, JobMutation, JobsController, ListState, MemberMutation,
    MembersController, Mutation, PendingConfirmation,
};
pub use error::{ClientError, RefreshFailure, Result};
pub use forms::{CategoryCatalog, JobForm, MemberForm, ValidationError};
pub use models::{
    CurrentUser, DataEnvelope, Identified, Job, JobDraft, JobId, JobStatus, LoginRequest, Member,
    MemberId, NewMember, Role,
};
pub use observability::ClientEvent;
pub use refresh::{
    HttpRefreshBackend, RefreshBackend, RefreshCoordinator, RefreshOutcome, SessionSignal,
};
pub use services::{AdminApi, AuthService, JobsService, MembersService, UserService};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenKind, TokenPair, TokenStore};
