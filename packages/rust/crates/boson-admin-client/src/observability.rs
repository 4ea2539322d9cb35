//! Stable event ids attached as the `event` field of every `tracing` call.

/// Structured log event emitted by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientEvent {
    /// Outgoing request finished with a status.
    HttpRequestCompleted,
    /// Outgoing request failed at the transport level.
    HttpRequestFailed,
    /// Request short-circuited because no access token is stored.
    HttpAuthMissing,
    /// A 401 triggered the one allowed refresh-and-resubmit.
    HttpRetryAfterRefresh,
    /// A resubmitted request was rejected again.
    HttpRetryRejected,
    /// Leader started a refresh network call.
    RefreshStarted,
    /// Caller queued behind an in-flight refresh.
    RefreshQueued,
    /// Access token was already rotated by another caller.
    RefreshReusedToken,
    /// Refresh succeeded and queued callers were released.
    RefreshSucceeded,
    /// Queued callers were handed the leader's outcome.
    RefreshWaitersReleased,
    /// Refresh failed; session cleared.
    RefreshFailed,
    /// A late caller got the failure that already cleared the session.
    RefreshFailureReplayed,
    /// In-flight refresh was dropped before completion.
    RefreshAbandoned,
    /// Login stored a new session.
    SessionLoggedIn,
    /// Session cleared by explicit logout.
    SessionLoggedOut,
    /// Session cleared after an unrecoverable refresh failure.
    SessionExpired,
    /// Token store read/write failed.
    SessionStoreFailed,
    /// A list fetch result was applied to local state.
    ControllerFetchApplied,
    /// A list fetch result arrived out of order and was discarded.
    ControllerFetchStale,
    /// A mutation was staged and awaits confirmation.
    ControllerMutationStaged,
    /// The role gate rejected a mutation.
    ControllerMutationDenied,
    /// A confirmed mutation completed and local state was patched.
    ControllerMutationApplied,
    /// A confirmed mutation failed; local state left unchanged.
    ControllerMutationFailed,
    /// Refetch after a create failed; the created item was inserted locally.
    ControllerRefetchFallback,
}

impl ClientEvent {
    /// Every event, for registry checks.
    pub const ALL: [Self; 24] = [
        Self::HttpRequestCompleted,
        Self::HttpRequestFailed,
        Self::HttpAuthMissing,
        Self::HttpRetryAfterRefresh,
        Self::HttpRetryRejected,
        Self::RefreshStarted,
        Self::RefreshQueued,
        Self::RefreshReusedToken,
        Self::RefreshSucceeded,
        Self::RefreshWaitersReleased,
        Self::RefreshFailed,
        Self::RefreshFailureReplayed,
        Self::RefreshAbandoned,
        Self::SessionLoggedIn,
        Self::SessionLoggedOut,
        Self::SessionExpired,
        Self::SessionStoreFailed,
        Self::ControllerFetchApplied,
        Self::ControllerFetchStale,
        Self::ControllerMutationStaged,
        Self::ControllerMutationDenied,
        Self::ControllerMutationApplied,
        Self::ControllerMutationFailed,
        Self::ControllerRefetchFallback,
    ];

    /// Dotted event id.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HttpRequestCompleted => "client.http.request_completed",
            Self::HttpRequestFailed => "client.http.request_failed",
            Self::HttpAuthMissing => "client.http.auth_missing",
            Self::HttpRetryAfterRefresh => "client.http.retry_after_refresh",
            Self::HttpRetryRejected => "client.http.retry_rejected",
            Self::RefreshStarted => "client.refresh.started",
            Self::RefreshQueued => "client.refresh.queued",
            Self::RefreshReusedToken => "client.refresh.reused_token",
            Self::RefreshSucceeded => "client.refresh.succeeded",
            Self::RefreshWaitersReleased => "client.refresh.waiters_released",
            Self::RefreshFailed => "client.refresh.failed",
            Self::RefreshFailureReplayed => "client.refresh.failure_replayed",
            Self::RefreshAbandoned => "client.refresh.abandoned",
            Self::SessionLoggedIn => "client.session.logged_in",
            Self::SessionLoggedOut => "client.session.logged_out",
            Self::SessionExpired => "client.session.expired",
            Self::SessionStoreFailed => "client.session.store_failed",
            Self::ControllerFetchApplied => "client.controller.fetch_applied",
            Self::ControllerFetchStale => "client.controller.fetch_stale",
            Self::ControllerMutationStaged => "client.controller.mutation_staged",
            Self::ControllerMutationDenied => "client.controller.mutation_denied",
            Self::ControllerMutationApplied => "client.controller.mutation_applied",
            Self::ControllerMutationFailed => "client.controller.mutation_failed",
            Self::ControllerRefetchFallback => "client.controller.refetch_fallback",
        }
    }
}
