//! Integration tests for login, bearer auth and the refresh-once protocol.

mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use boson_admin_client::{
    AdminApi, ClientConfig, ClientError, FileTokenStore, MemoryTokenStore, RefreshFailure,
    SessionSignal, TokenKind, TokenStore,
};
use support::{PASSWORD, REFRESH_TOKEN, spawn_backend};
use tokio::task::JoinSet;

fn connect(base_url: &str, tokens: Arc<dyn TokenStore>) -> AdminApi {
    AdminApi::connect(ClientConfig::with_base_url(base_url), tokens).expect("client")
}

#[tokio::test]
async fn login_stores_tokens_and_signals() -> Result<()> {
    let Some((base_url, _backend)) = spawn_backend("admin").await? else {
        return Ok(());
    };
    let store = Arc::new(MemoryTokenStore::new());
    let api = connect(&base_url, store.clone());
    let mut signals = api.client.subscribe();

    assert!(!api.auth.is_authenticated()?);
    api.auth.login("root@boson.io", PASSWORD).await?;

    assert!(api.auth.is_authenticated()?);
    assert_eq!(store.get(TokenKind::Access)?.as_deref(), Some("a1"));
    assert_eq!(store.get(TokenKind::Refresh)?.as_deref(), Some(REFRESH_TOKEN));
    assert_eq!(signals.recv().await?, SessionSignal::LoggedIn);

    let members = api.members.list().await?;
    assert_eq!(members.len(), 3);
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() -> Result<()> {
    let Some((base_url, _backend)) = spawn_backend("admin").await? else {
        return Ok(());
    };
    let store = Arc::new(MemoryTokenStore::new());
    let api = connect(&base_url, store.clone());

    let err = api
        .auth
        .login("root@boson.io", "nope")
        .await
        .expect_err("rejected login");
    assert!(matches!(err, ClientError::InvalidCredentials));
    assert!(store.get(TokenKind::Access)?.is_none());
    Ok(())
}

#[tokio::test]
async fn missing_token_never_reaches_the_backend() -> Result<()> {
    let Some((base_url, backend)) = spawn_backend("admin").await? else {
        return Ok(());
    };
    let api = connect(&base_url, Arc::new(MemoryTokenStore::new()));

    let err = api.jobs.list().await.expect_err("no session");
    assert!(matches!(err, ClientError::AuthMissing));
    assert!(err.is_auth_failure());
    assert_eq!(backend.requests.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_resubmitted() -> Result<()> {
    let Some((base_url, backend)) = spawn_backend("admin").await? else {
        return Ok(());
    };
    let store = Arc::new(MemoryTokenStore::with_tokens("a1", REFRESH_TOKEN));
    let api = connect(&base_url, store.clone());
    backend.expire_access();

    let jobs = api.jobs.list().await?;

    assert_eq!(jobs.len(), 1);
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.unauthorized.load(Ordering::SeqCst), 1);
    assert_eq!(backend.job_list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.get(TokenKind::Access)?.as_deref(), Some("a2"));
    Ok(())
}

#[tokio::test]
async fn resubmitted_mutation_keeps_method_and_body() -> Result<()> {
    let Some((base_url, backend)) = spawn_backend("admin").await? else {
        return Ok(());
    };
    let api = connect(
        &base_url,
        Arc::new(MemoryTokenStore::with_tokens("a1", REFRESH_TOKEN)),
    );
    backend.expire_access();

    let form = boson_admin_client::MemberForm {
        username: "carol".to_string(),
        email: "carol@boson.io".to_string(),
        role: "Viewer".to_string(),
        password: "pw".to_string(),
    };
    let created = api.members.create(&form.validate()?).await?;

    assert_eq!(created.username, "carol");
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.members().len(), 4);
    Ok(())
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() -> Result<()> {
    let Some((base_url, backend)) = spawn_backend("admin").await? else {
        return Ok(());
    };
    let api = connect(
        &base_url,
        Arc::new(MemoryTokenStore::with_tokens("a1", REFRESH_TOKEN)),
    );
    backend.expire_access();
    backend.set_refresh_delay(Duration::from_millis(200));

    let mut tasks = JoinSet::new();
    for index in 0..8 {
        let api = api.clone();
        tasks.spawn(async move {
            if index % 2 == 0 {
                api.jobs.list().await.map(|jobs| jobs.len())
            } else {
                api.members.list().await.map(|members| members.len())
            }
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined??;
    }

    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.client.refresh_coordinator().refresh_calls(), 1);
    assert!(!api.client.refresh_coordinator().is_refreshing());
    Ok(())
}

#[tokio::test]
async fn failed_refresh_clears_session_without_retrying() -> Result<()> {
    let Some((base_url, backend)) = spawn_backend("admin").await? else {
        return Ok(());
    };
    let store = Arc::new(MemoryTokenStore::with_tokens("a1", REFRESH_TOKEN));
    let api = connect(&base_url, store.clone());
    let mut signals = api.client.subscribe();
    backend.expire_access();
    backend.fail_refresh();

    let err = api.members.list().await.expect_err("session expired");

    assert!(matches!(
        err,
        ClientError::AuthExpired {
            reason: RefreshFailure::Rejected { status: 401 }
        }
    ));
    assert_eq!(backend.member_list_calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.unauthorized.load(Ordering::SeqCst), 1);
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert!(store.get(TokenKind::Access)?.is_none());
    assert!(store.get(TokenKind::Refresh)?.is_none());
    assert_eq!(signals.recv().await?, SessionSignal::Expired);

    // Session is gone: the next call fails locally.
    let err = api.members.list().await.expect_err("logged out");
    assert!(matches!(err, ClientError::AuthMissing));
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_batch_shares_one_failure_and_one_expiry() -> Result<()> {
    for _ in 0..10 {
        let Some((base_url, backend)) = spawn_backend("admin").await? else {
            return Ok(());
        };
        let api = connect(
            &base_url,
            Arc::new(MemoryTokenStore::with_tokens("a1", REFRESH_TOKEN)),
        );
        let mut signals = api.client.subscribe();
        backend.expire_access();
        backend.fail_refresh();

        let mut tasks = JoinSet::new();
        for _ in 0..8 {
            let api = api.clone();
            tasks.spawn(async move { api.jobs.list().await });
        }
        let mut reasons = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined? {
                Err(ClientError::AuthExpired { reason }) => reasons.push(reason),
                // Started after the session was cleared, so it was never sent.
                Err(ClientError::AuthMissing) => {}
                other => anyhow::bail!("unexpected outcome: {other:?}"),
            }
        }

        assert!(!reasons.is_empty());
        assert!(
            reasons
                .iter()
                .all(|reason| *reason == RefreshFailure::Rejected { status: 401 }),
            "divergent reasons: {reasons:?}"
        );
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(signals.try_recv()?, SessionSignal::Expired);
        assert!(signals.try_recv().is_err(), "expiry signalled more than once");
    }
    Ok(())
}

#[tokio::test]
async fn configured_timeout_bounds_the_refresh_call() -> Result<()> {
    let Some((base_url, backend)) = spawn_backend("admin").await? else {
        return Ok(());
    };
    let config = ClientConfig {
        timeout_secs: 1,
        ..ClientConfig::with_base_url(&base_url)
    };
    let api = AdminApi::connect(
        config,
        Arc::new(MemoryTokenStore::with_tokens("a1", REFRESH_TOKEN)),
    )?;
    backend.expire_access();
    backend.set_refresh_delay(Duration::from_secs(5));

    let started = std::time::Instant::now();
    let err = api.jobs.list().await.expect_err("refresh timed out");

    assert!(matches!(
        err,
        ClientError::AuthExpired {
            reason: RefreshFailure::Transport(_)
        }
    ));
    assert!(started.elapsed() < Duration::from_secs(4));
    Ok(())
}

#[tokio::test]
async fn second_unauthorized_after_refresh_is_returned_as_is() -> Result<()> {
    let Some((base_url, backend)) = spawn_backend("admin").await? else {
        return Ok(());
    };
    let api = connect(
        &base_url,
        Arc::new(MemoryTokenStore::with_tokens("a1", REFRESH_TOKEN)),
    );
    backend.reject_all();

    let err = api.jobs.list().await.expect_err("still unauthorized");

    assert_eq!(err.status(), Some(401));
    assert!(err.is_auth_failure());
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.unauthorized.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn logout_clears_tokens_and_signals() -> Result<()> {
    let Some((base_url, _backend)) = spawn_backend("admin").await? else {
        return Ok(());
    };
    let store = Arc::new(MemoryTokenStore::with_tokens("a1", REFRESH_TOKEN));
    let api = connect(&base_url, store.clone());
    let mut signals = api.client.subscribe();

    api.auth.logout()?;

    assert!(!api.auth.is_authenticated()?);
    assert_eq!(signals.recv().await?, SessionSignal::LoggedOut);
    Ok(())
}

#[tokio::test]
async fn file_store_session_survives_a_new_client() -> Result<()> {
    let Some((base_url, _backend)) = spawn_backend("editor").await? else {
        return Ok(());
    };
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session").join("tokens.json");

    let first = connect(&base_url, Arc::new(FileTokenStore::new(&path)));
    first.auth.login("root@boson.io", PASSWORD).await?;
    drop(first);

    let second = connect(&base_url, Arc::new(FileTokenStore::new(&path)));
    let user = second.user.current_user().await?;
    assert_eq!(user.username, "root");
    assert_eq!(user.role, boson_admin_client::Role::Editor);
    Ok(())
}
