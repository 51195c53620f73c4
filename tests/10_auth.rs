mod common;

use anyhow::Result;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use elpix_admin::auth::{expiry, FileSessionStore, SessionStore};
use elpix_admin::config::config;
use elpix_admin::{ApiClient, ClientError};

#[tokio::test]
async fn login_persists_session_to_disk() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.json");

    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&path));
    let client = ApiClient::new(&server.base_url, Arc::clone(&store), config())?;

    let before = expiry::now_ms();
    let login = client.tokens().login(common::USERNAME, common::PASSWORD).await?;
    assert_eq!(login.token, "access-1");
    assert_eq!(login.message, "Login successfully");
    assert_eq!(login.user.as_ref().map(|u| u.role_id.as_str()), Some(common::ROLE_ID));

    // A fresh client over the same file picks the session up
    let reloaded = FileSessionStore::new(&path).load()?;
    assert_eq!(reloaded.token(), Some("access-1"));
    assert_eq!(reloaded.refresh_token(), Some("refresh-1"));
    assert_eq!(reloaded.user().map(|u| u.username), Some(common::USERNAME.to_string()));

    // "1h" from login time
    let expires_at = reloaded.expires_at();
    assert!(expires_at >= before + 3_600_000);
    assert!(expires_at <= expiry::now_ms() + 3_600_000);

    let profile = client.profile().await?;
    assert_eq!(profile.fullname, "Studio Operator");
    assert_eq!(server.state.refresh_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn wrong_password_surfaces_server_message() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let client = server.client()?;

    let err = client.tokens().login(common::USERNAME, "nope").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid username or password");
    assert_eq!(err.status_code(), Some(400));
    assert!(!client.tokens().state().await.is_logged_in());
    Ok(())
}

#[tokio::test]
async fn missing_token_is_unauthenticated() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let client = server.client()?;

    let err = client.profile().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthenticated));
    assert!(server.state.seen_tokens().is_empty());
    Ok(())
}

#[tokio::test]
async fn expired_token_is_refreshed_before_the_request() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let client = server.client_with(common::expired_session())?;

    let profile = client.profile().await?;
    assert_eq!(profile.username, common::USERNAME);
    assert_eq!(server.state.refresh_calls(), 1);
    assert_eq!(server.state.seen_tokens(), vec!["access-2".to_string()]);

    let state = client.tokens().state().await;
    assert_eq!(state.token(), Some("access-2"));
    assert!(!state.is_token_expired(expiry::now_ms()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_refresh() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let client = server.client_with(common::expired_session())?;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move { client.profile().await }));
    }
    for task in tasks {
        task.await??;
    }

    assert_eq!(server.state.refresh_calls(), 1);
    let seen = server.state.seen_tokens();
    assert_eq!(seen.len(), 8);
    assert!(seen.iter().all(|t| t == "access-2"), "{seen:?}");
    Ok(())
}

#[tokio::test]
async fn failed_refresh_requires_login_again() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    server.state.fail_refresh.store(true, Ordering::SeqCst);
    let client = server.client_with(common::expired_session())?;

    let err = client.profile().await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired(_)), "{err:?}");
    assert!(err.is_auth_error());

    // Auth values are gone, the locale stays
    let state = client.tokens().state().await;
    assert!(!state.is_logged_in());
    assert!(state.refresh_token().is_none());
    assert!(state.user().is_none());
    assert_eq!(state.locale(), Some("id"));

    // Further calls fail fast without another refresh attempt
    let again = client.profile().await.unwrap_err();
    assert!(matches!(again, ClientError::Unauthenticated));
    assert_eq!(server.state.refresh_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn refresh_outage_keeps_the_session() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    server.state.refresh_outage.store(true, Ordering::SeqCst);
    let client = server.client_with(common::expired_session())?;

    let err = client.profile().await.unwrap_err();
    assert_eq!(err.status_code(), Some(503), "{err:?}");
    assert!(!err.is_auth_error());

    let state = client.tokens().state().await;
    assert!(state.is_logged_in());
    assert_eq!(state.refresh_token(), Some("refresh-1"));

    // Once the backend is back the same session refreshes normally
    server.state.refresh_outage.store(false, Ordering::SeqCst);
    let profile = client.profile().await?;
    assert_eq!(profile.username, common::USERNAME);
    assert_eq!(server.state.refresh_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_keeps_the_session() -> Result<()> {
    let store = Arc::new(elpix_admin::auth::MemorySessionStore::new(common::expired_session()));
    let client = ApiClient::new("http://127.0.0.1:1", store, config())?;

    let err = client.profile().await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)), "{err:?}");

    let state = client.tokens().state().await;
    assert_eq!(state.refresh_token(), Some("refresh-1"));
    assert!(state.user().is_some());
    Ok(())
}

#[tokio::test]
async fn logout_clears_persisted_values() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let client = server.client()?;
    client.tokens().login(common::USERNAME, common::PASSWORD).await?;
    client.tokens().set_locale("en").await?;

    client.tokens().logout().await?;
    let state = client.tokens().state().await;
    assert!(state.token().is_none());
    assert!(state.user().is_none());
    assert_eq!(state.locale(), Some("en"));
    Ok(())
}
