//! Single-flight access-token refresh.
//!
//! State machine: `Idle -> Refreshing -> Idle`. While a refresh is in flight,
//! further callers park on a oneshot and receive the leader's outcome; only
//! the leader talks to the network. On failure the session is cleared and
//! [`SessionSignal::Expired`] is broadcast so front ends can return to login.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{broadcast, oneshot};

use crate::config::ClientConfig;
use crate::error::RefreshFailure;
use crate::observability::ClientEvent;
use crate::token_store::{TokenKind, TokenPair, TokenStore};

/// Session lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// Tokens stored by a successful login.
    LoggedIn,
    /// Tokens cleared by an explicit logout.
    LoggedOut,
    /// Tokens cleared after an unrecoverable refresh failure; go to login.
    Expired,
}

/// Outcome handed to the leader and every queued caller.
pub type RefreshOutcome = std::result::Result<String, RefreshFailure>;

/// Network half of the refresh: trade a refresh token for a new pair.
#[async_trait]
pub trait RefreshBackend: Send + Sync {
    /// Exchange `refresh_token` for new tokens.
    async fn refresh(&self, refresh_token: &str) -> std::result::Result<TokenPair, RefreshFailure>;
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// `POST /users/refresh/` with `{ "refresh_token": ... }`.
pub struct HttpRefreshBackend {
    http: reqwest::Client,
    url: String,
}

impl HttpRefreshBackend {
    /// Backend for the API root in `config`.
    ///
    /// # Errors
    /// Returns [`crate::ClientError::Network`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> crate::error::Result<Self> {
        Ok(Self::with_client(config.build_http_client()?, config))
    }

    pub(crate) fn with_client(http: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            http,
            url: config.url_for("/users/refresh/"),
        }
    }
}

#[async_trait]
impl RefreshBackend for HttpRefreshBackend {
    async fn refresh(&self, refresh_token: &str) -> std::result::Result<TokenPair, RefreshFailure> {
        let response = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|error| RefreshFailure::Transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RefreshFailure::Rejected {
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|error| RefreshFailure::Transport(error.to_string()))?;
        let parsed: RefreshResponse = serde_json::from_slice(&body)
            .map_err(|error| RefreshFailure::Decode(error.to_string()))?;
        Ok(TokenPair {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
        })
    }
}

enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// Turns the refresh token into a new access token at most once at a time.
pub struct RefreshCoordinator {
    tokens: Arc<dyn TokenStore>,
    backend: Arc<dyn RefreshBackend>,
    state: Mutex<RefreshState>,
    // Failure that last cleared the session; replayed to late callers of the same batch.
    last_failure: Mutex<Option<RefreshFailure>>,
    signals: broadcast::Sender<SessionSignal>,
    refresh_calls: AtomicUsize,
}

/// Resets the state to `Idle` if the leading future is dropped mid-refresh.
struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    armed: bool,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let waiters = self.coordinator.take_waiters();
        tracing::warn!(
            event = ClientEvent::RefreshAbandoned.as_str(),
            queued_callers = waiters.len(),
            "token refresh dropped before completion"
        );
        // Dropping the senders wakes every waiter with `Abandoned`.
        drop(waiters);
    }
}

impl RefreshCoordinator {
    /// Coordinator over `tokens`, refreshing through `backend`.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStore>, backend: Arc<dyn RefreshBackend>) -> Self {
        let (signals, _) = broadcast::channel(16);
        Self {
            tokens,
            backend,
            state: Mutex::new(RefreshState::Idle),
            last_failure: Mutex::new(None),
            signals,
            refresh_calls: AtomicUsize::new(0),
        }
    }

    /// Receive session lifecycle signals.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.signals.subscribe()
    }

    /// Number of refresh network calls issued so far.
    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Whether a refresh is currently in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::Refreshing { .. })
    }

    pub(crate) fn notify(&self, signal: SessionSignal) {
        if signal == SessionSignal::LoggedIn {
            *self.lock_last_failure() = None;
        }
        // No subscribers is fine.
        let _ = self.signals.send(signal);
    }

    /// Obtain a fresh access token after `stale_access_token` was rejected.
    ///
    /// If the stored token already differs from the stale one, another caller
    /// refreshed in the meantime and that token is returned without a network
    /// call. If the session was cleared by a refresh failure after
    /// `stale_access_token` was sent, that same failure is returned without a
    /// second refresh or expiry signal. Otherwise joins the in-flight refresh
    /// or leads a new one.
    ///
    /// # Errors
    /// Returns the shared [`RefreshFailure`]; by then both tokens are cleared.
    pub async fn refresh(&self, stale_access_token: Option<&str>) -> RefreshOutcome {
        let receiver = {
            let mut state = self.lock_state();
            match self.tokens.get(TokenKind::Access) {
                Ok(Some(current)) if stale_access_token != Some(current.as_str()) => {
                    tracing::debug!(
                        event = ClientEvent::RefreshReusedToken.as_str(),
                        "access token already rotated by another caller"
                    );
                    return Ok(current);
                }
                Ok(None) if stale_access_token.is_some() => {
                    if let Some(failure) = self.lock_last_failure().clone() {
                        tracing::debug!(
                            event = ClientEvent::RefreshFailureReplayed.as_str(),
                            reason = %failure,
                            "session already cleared by a failed refresh"
                        );
                        return Err(failure);
                    }
                }
                Ok(_) => {}
                Err(error) => return Err(RefreshFailure::Store(error.to_string())),
            }
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: Vec::new(),
                    };
                    None
                }
            }
        };

        if let Some(rx) = receiver {
            tracing::debug!(
                event = ClientEvent::RefreshQueued.as_str(),
                "waiting for in-flight token refresh"
            );
            return rx.await.unwrap_or(Err(RefreshFailure::Abandoned));
        }

        let mut guard = LeaderGuard {
            coordinator: self,
            armed: true,
        };
        let outcome = self.run_refresh().await;
        guard.armed = false;

        let waiters = self.take_waiters();
        let released = waiters.len();
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
        tracing::debug!(
            event = ClientEvent::RefreshWaitersReleased.as_str(),
            queued_callers = released,
            success = outcome.is_ok(),
            "token refresh waiters released"
        );
        outcome
    }

    async fn run_refresh(&self) -> RefreshOutcome {
        let refresh_token = match self.tokens.get(TokenKind::Refresh) {
            Ok(Some(token)) => token,
            Ok(None) => return self.fail(RefreshFailure::MissingRefreshToken),
            Err(error) => return self.fail(RefreshFailure::Store(error.to_string())),
        };
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            event = ClientEvent::RefreshStarted.as_str(),
            "refreshing access token"
        );
        match self.backend.refresh(&refresh_token).await {
            Ok(pair) => match self.tokens.store_pair(&pair) {
                Ok(()) => {
                    *self.lock_last_failure() = None;
                    tracing::info!(
                        event = ClientEvent::RefreshSucceeded.as_str(),
                        rotated_refresh_token = pair.refresh_token.is_some(),
                        "access token refreshed"
                    );
                    Ok(pair.access_token)
                }
                Err(error) => self.fail(RefreshFailure::Store(error.to_string())),
            },
            Err(failure) => self.fail(failure),
        }
    }

    fn fail(&self, failure: RefreshFailure) -> RefreshOutcome {
        // Recorded before the tokens go so no caller sees a cleared session without it.
        *self.lock_last_failure() = Some(failure.clone());
        if let Err(error) = self.tokens.clear() {
            tracing::warn!(
                event = ClientEvent::SessionStoreFailed.as_str(),
                error = %error,
                "failed to clear tokens after refresh failure"
            );
        }
        tracing::warn!(
            event = ClientEvent::RefreshFailed.as_str(),
            reason = %failure,
            "token refresh failed; session cleared"
        );
        tracing::info!(
            event = ClientEvent::SessionExpired.as_str(),
            "session expired"
        );
        self.notify(SessionSignal::Expired);
        Err(failure)
    }

    fn take_waiters(&self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        let mut state = self.lock_state();
        match std::mem::replace(&mut *state, RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_last_failure(&self) -> MutexGuard<'_, Option<RefreshFailure>> {
        self.last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::task::JoinSet;

    use super::*;
    use crate::token_store::MemoryTokenStore;

    struct FakeBackend {
        calls: AtomicUsize,
        delay: Duration,
        result: std::result::Result<TokenPair, RefreshFailure>,
    }

    impl FakeBackend {
        fn succeeding(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                result: Ok(TokenPair {
                    access_token: "fresh".to_string(),
                    refresh_token: Some("rotated".to_string()),
                }),
            }
        }

        fn failing(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                result: Err(RefreshFailure::Rejected { status: 401 }),
            }
        }
    }

    #[async_trait]
    impl RefreshBackend for FakeBackend {
        async fn refresh(
            &self,
            refresh_token: &str,
        ) -> std::result::Result<TokenPair, RefreshFailure> {
            assert_eq!(refresh_token, "r1");
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    fn coordinator(
        backend: Arc<FakeBackend>,
    ) -> (Arc<RefreshCoordinator>, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::with_tokens("stale", "r1"));
        let coordinator = Arc::new(RefreshCoordinator::new(store.clone(), backend));
        (coordinator, store)
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let backend = Arc::new(FakeBackend::succeeding(Duration::from_millis(50)));
        let (coordinator, store) = coordinator(backend.clone());

        let mut tasks = JoinSet::new();
        for _ in 0..8 {
            let coordinator = Arc::clone(&coordinator);
            tasks.spawn(async move { coordinator.refresh(Some("stale")).await });
        }
        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            outcomes.push(joined.expect("task panicked"));
        }

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.refresh_calls(), 1);
        assert_eq!(outcomes.len(), 8);
        assert!(outcomes.iter().all(|o| o.as_deref() == Ok("fresh")));
        assert_eq!(store.get(TokenKind::Access).expect("get").as_deref(), Some("fresh"));
        assert_eq!(store.get(TokenKind::Refresh).expect("get").as_deref(), Some("rotated"));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn failure_is_shared_clears_session_and_signals_expiry() {
        let backend = Arc::new(FakeBackend::failing(Duration::from_millis(50)));
        let (coordinator, store) = coordinator(backend.clone());
        let mut signals = coordinator.subscribe();

        let mut tasks = JoinSet::new();
        for _ in 0..5 {
            let coordinator = Arc::clone(&coordinator);
            tasks.spawn(async move { coordinator.refresh(Some("stale")).await });
        }
        while let Some(joined) = tasks.join_next().await {
            assert_eq!(
                joined.expect("task panicked"),
                Err(RefreshFailure::Rejected { status: 401 })
            );
        }

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(TokenKind::Access).expect("get"), None);
        assert_eq!(store.get(TokenKind::Refresh).expect("get"), None);
        assert_eq!(signals.try_recv().expect("signal"), SessionSignal::Expired);
    }

    #[tokio::test]
    async fn late_caller_after_failure_gets_the_same_reason_once() {
        let backend = Arc::new(FakeBackend::failing(Duration::ZERO));
        let (coordinator, store) = coordinator(backend.clone());
        let mut signals = coordinator.subscribe();

        let first = coordinator.refresh(Some("stale")).await;
        // A 401 for a request sent with the old token lands after the session was cleared.
        let late = coordinator.refresh(Some("stale")).await;

        assert_eq!(first, Err(RefreshFailure::Rejected { status: 401 }));
        assert_eq!(late, first);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(signals.try_recv().expect("signal"), SessionSignal::Expired);
        assert!(signals.try_recv().is_err());

        // A new login forgets the old failure.
        store.set(TokenKind::Refresh, "r1").expect("seed");
        coordinator.notify(SessionSignal::LoggedIn);
        let after_login = coordinator.refresh(Some("stale")).await;
        assert_eq!(after_login, Err(RefreshFailure::Rejected { status: 401 }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_refresh_token_fails_without_network_call() {
        let backend = Arc::new(FakeBackend::succeeding(Duration::ZERO));
        let store = Arc::new(MemoryTokenStore::new());
        store.set(TokenKind::Access, "stale").expect("seed");
        let coordinator = RefreshCoordinator::new(store.clone(), backend.clone());

        let outcome = coordinator.refresh(Some("stale")).await;

        assert_eq!(outcome, Err(RefreshFailure::MissingRefreshToken));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.get(TokenKind::Access).expect("get"), None);
    }

    #[tokio::test]
    async fn already_rotated_token_is_reused() {
        let backend = Arc::new(FakeBackend::succeeding(Duration::ZERO));
        let (coordinator, store) = coordinator(backend.clone());
        store.set(TokenKind::Access, "newer").expect("seed");

        let outcome = coordinator.refresh(Some("stale")).await;

        assert_eq!(outcome.as_deref(), Ok("newer"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_leader_returns_to_idle() {
        let backend = Arc::new(FakeBackend::succeeding(Duration::from_secs(30)));
        let (coordinator, _store) = coordinator(backend.clone());

        let leader = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.refresh(Some("stale")).await })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }
        let follower = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.refresh(Some("stale")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        leader.abort();
        let _ = leader.await;

        assert_eq!(
            follower.await.expect("follower panicked"),
            Err(RefreshFailure::Abandoned)
        );
        assert!(!coordinator.is_refreshing());
    }
}
