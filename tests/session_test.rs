mod common;

use std::{sync::Arc, time::Duration};

use common::{FakeAuth, Harness, MemoryStore, grant};
use futures::future::join_all;
use spotmpris::{
    SyncError,
    management::{Acquired, SessionManager},
};

fn session_with(store: Arc<MemoryStore>) -> (Arc<FakeAuth>, SessionManager) {
    let auth = Arc::new(FakeAuth::new());
    let session = SessionManager::new(auth.clone(), store);
    (auth, session)
}

#[tokio::test]
async fn test_acquire_without_stored_token_awaits_authorization() {
    let store = Arc::new(MemoryStore::default());
    let (auth, session) = session_with(store);

    let acquired = session.acquire().await.unwrap();

    match acquired {
        Acquired::AwaitingAuthorization(url) => {
            assert!(url.starts_with("https://accounts.test/authorize"));
            assert!(url.contains("client_id=test-client"));
        }
        other => panic!("expected authorization URL, got {:?}", other),
    }
    assert!(!session.is_authenticated());
    assert_eq!(auth.refreshes(), 0);
}

#[tokio::test]
async fn test_acquire_exchanges_stored_refresh_token() {
    let store = Arc::new(MemoryStore::with_token("stored-refresh"));
    let (auth, session) = session_with(store.clone());

    let acquired = session.acquire().await.unwrap();

    match acquired {
        Acquired::Ready(credential) => {
            assert_eq!(credential.access_token, "access-refreshed");
            // refresh response without a new refresh token keeps the old one
            assert_eq!(credential.refresh_token, "stored-refresh");
        }
        other => panic!("expected a credential, got {:?}", other),
    }
    assert_eq!(auth.refreshes(), 1);
    assert_eq!(store.save_count(), 0);
    assert_eq!(store.token().as_deref(), Some("stored-refresh"));
}

#[tokio::test]
async fn test_ensure_fresh_within_margin_is_idempotent() {
    let store = Arc::new(MemoryStore::with_token("stored-refresh"));
    let (auth, session) = session_with(store);
    session.acquire().await.unwrap();

    let first = session.ensure_fresh().await.unwrap();
    for _ in 0..5 {
        let again = session.ensure_fresh().await.unwrap();
        assert_eq!(again.access_token, first.access_token);
    }

    assert_eq!(auth.refreshes(), 1);
}

#[tokio::test]
async fn test_ensure_fresh_renews_inside_safety_margin() {
    let harness = Harness::new();
    harness
        .auth
        .set_code_result(Ok(grant("short-lived", Some("refresh-code"), 300)));
    harness.session.complete_authorization("code").await.unwrap();

    let credential = harness.session.ensure_fresh().await.unwrap();

    assert_eq!(credential.access_token, "access-refreshed");
    assert_eq!(harness.auth.refreshes(), 1);
}

#[tokio::test]
async fn test_concurrent_ensure_fresh_shares_one_exchange() {
    let harness = Harness::new();
    harness
        .auth
        .set_code_result(Ok(grant("expired", Some("refresh-code"), 0)));
    harness.auth.set_refresh_delay(Duration::from_millis(50));
    harness.session.complete_authorization("code").await.unwrap();

    let results = join_all((0..8).map(|_| harness.session.ensure_fresh())).await;

    assert_eq!(harness.auth.refreshes(), 1);
    for result in results {
        assert_eq!(result.unwrap().access_token, "access-refreshed");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ensure_fresh_across_tasks_shares_one_exchange() {
    let harness = Harness::new();
    harness
        .auth
        .set_code_result(Ok(grant("expired", Some("refresh-code"), 0)));
    harness.auth.set_refresh_delay(Duration::from_millis(100));
    harness.session.complete_authorization("code").await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let session = harness.session.clone();
            tokio::spawn(async move { session.ensure_fresh().await })
        })
        .collect();

    for handle in handles {
        let credential = handle.await.unwrap().unwrap();
        assert_eq!(credential.access_token, "access-refreshed");
    }
    assert_eq!(harness.auth.refreshes(), 1);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_persisted() {
    let store = Arc::new(MemoryStore::with_token("old-refresh"));
    let (auth, session) = session_with(store.clone());
    auth.set_refresh_result(Ok(grant("new-access", Some("rotated-refresh"), 3600)));

    session.acquire().await.unwrap();

    assert_eq!(store.token().as_deref(), Some("rotated-refresh"));
    assert_eq!(store.save_count(), 1);
    assert_eq!(
        session.current().unwrap().refresh_token,
        "rotated-refresh".to_string()
    );
}

#[tokio::test]
async fn test_complete_authorization_persists_refresh_token() {
    let harness = Harness::new();

    let credential = harness
        .session
        .complete_authorization("valid-code")
        .await
        .unwrap();

    assert_eq!(credential.access_token, "access-code");
    assert!(harness.session.is_authenticated());
    assert_eq!(harness.store.token().as_deref(), Some("refresh-code"));
}

#[tokio::test]
async fn test_rejected_authorization_code_leaves_session_unauthenticated() {
    let harness = Harness::new();
    harness.auth.set_code_result(Err(SyncError::AuthExchange(
        "invalid_grant: Invalid authorization code".to_string(),
    )));

    let result = harness.session.complete_authorization("stale-code").await;

    assert!(matches!(result, Err(SyncError::AuthExchange(_))));
    assert!(!harness.session.is_authenticated());
    assert_eq!(harness.store.token(), None);
    assert_eq!(harness.store.save_count(), 0);
}

#[tokio::test]
async fn test_revoked_refresh_token_ends_session() {
    let store = Arc::new(MemoryStore::with_token("revoked"));
    let (auth, session) = session_with(store.clone());
    auth.set_refresh_result(Err(SyncError::Refresh(
        "invalid_grant: Refresh token revoked".to_string(),
    )));

    let acquired = session.acquire().await.unwrap();

    assert!(matches!(acquired, Acquired::AwaitingAuthorization(_)));
    assert!(!session.is_authenticated());
    assert_eq!(store.token(), None);
    assert!(matches!(
        session.ensure_fresh().await,
        Err(SyncError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_transient_refresh_failure_keeps_session_for_retry() {
    let store = Arc::new(MemoryStore::with_token("stored-refresh"));
    let (auth, session) = session_with(store.clone());
    auth.set_refresh_result(Err(SyncError::Transient("HTTP 503".to_string())));

    let result = session.acquire().await;

    assert!(matches!(result, Err(SyncError::Transient(_))));
    assert!(session.is_authenticated());
    assert_eq!(store.token().as_deref(), Some("stored-refresh"));

    auth.set_refresh_result(Ok(grant("recovered", None, 3600)));
    let credential = session.ensure_fresh().await.unwrap();
    assert_eq!(credential.access_token, "recovered");
    assert_eq!(auth.refreshes(), 2);
}

#[tokio::test]
async fn test_ensure_fresh_without_session_is_unauthenticated() {
    let (auth, session) = session_with(Arc::new(MemoryStore::default()));

    assert!(matches!(
        session.ensure_fresh().await,
        Err(SyncError::Unauthenticated)
    ));
    assert_eq!(auth.refreshes(), 0);
}

#[tokio::test]
async fn test_invalidated_access_token_is_refreshed() {
    let harness = Harness::authorized().await;
    assert_eq!(harness.auth.refreshes(), 0);

    harness.session.invalidate_access_token();
    let credential = harness.session.ensure_fresh().await.unwrap();

    assert_eq!(credential.access_token, "access-refreshed");
    assert_eq!(harness.auth.refreshes(), 1);
}

#[tokio::test]
async fn test_grants_are_announced() {
    let harness = Harness::new();
    let mut grants = harness.session.subscribe_grants();

    harness.session.complete_authorization("code").await.unwrap();

    assert!(grants.has_changed().unwrap());
    assert_eq!(*grants.borrow_and_update(), 1);
}
