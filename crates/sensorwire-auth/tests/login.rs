//! Integration tests for login, role checks, and session eviction.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sensorwire_auth::{
    AuthError, AuthService, CredentialProvider, NoopJanitor, Principal, SessionCache,
    SessionJanitor, SessionRecord, StaticCredentials,
};
use sensorwire_core::config::{AuthConfig, UserConfig};

fn config() -> AuthConfig {
    AuthConfig {
        users: vec![
            UserConfig {
                username: "reader".to_owned(),
                password: "r".to_owned(),
                roles: vec!["read".to_owned()],
            },
            UserConfig {
                username: "nobody".to_owned(),
                password: "n".to_owned(),
                roles: Vec::new(),
            },
        ],
        ..AuthConfig::default()
    }
}

struct BrokenJanitor;

impl SessionJanitor for BrokenJanitor {
    fn before_login(
        &self,
        _cache: &SessionCache,
        _now: DateTime<Utc>,
    ) -> Result<Vec<String>, AuthError> {
        Err(AuthError::Cleanup {
            message: "store unavailable".to_owned(),
        })
    }
}

struct BrokenProvider;

impl CredentialProvider for BrokenProvider {
    fn authenticate(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<Option<Principal>, AuthError> {
        Err(AuthError::Provider {
            message: "directory offline".to_owned(),
        })
    }
}

#[test]
fn login_opens_session_and_grants_roles() {
    let auth = AuthService::from_config(&config());
    assert!(auth.is_valid_user("c1", "reader", "r"));
    assert!(auth.user_has_role("c1", "reader", "READ"));
    assert!(!auth.user_has_role("c1", "reader", "write"));
    assert!(auth.may_read("c1", "reader"));

    assert!(auth.is_valid_user("c2", "nobody", "n"));
    assert!(!auth.may_read("c2", "nobody"));

    assert!(!auth.is_valid_user("c3", "reader", "wrong"));
    assert!(!auth.user_has_role("c3", "reader", "read"));

    auth.logout("c1");
    assert!(!auth.may_read("c1", "reader"));
}

#[test]
fn anonymous_read_bypasses_roles() {
    let auth = AuthService::from_config(&AuthConfig {
        allow_anonymous_read: true,
        ..config()
    });
    assert!(auth.may_read("anyone", ""));
}

#[test]
fn login_sweeps_stale_sessions() {
    let auth = AuthService::from_config(&config());
    let long_ago = Utc::now().checked_sub_signed(Duration::hours(48)).unwrap();
    auth.sessions().put(
        "idle",
        SessionRecord::new("idle", Principal::new("reader", ["read"]), long_ago),
    );
    let outcome = auth.login("c1", "reader", "r");
    assert!(outcome.accepted);
    assert_eq!(outcome.evicted, vec!["idle".to_owned()]);
    assert!(auth.sessions().get("idle").is_none());
    assert!(auth.sessions().get("c1").is_some());
}

#[test]
fn cleanup_failure_does_not_block_login() {
    let auth = AuthService::new(
        Arc::new(SessionCache::new()),
        Arc::new(StaticCredentials::from_config(&config().users)),
        Arc::new(BrokenJanitor),
    );
    let outcome = auth.login("c1", "reader", "r");
    assert!(outcome.accepted);
    assert!(outcome.evicted.is_empty());
    assert_eq!(auth.sessions().len(), 1);
}

#[test]
fn provider_failure_rejects_login() {
    let auth = AuthService::new(
        Arc::new(SessionCache::new()),
        Arc::new(BrokenProvider),
        Arc::new(NoopJanitor),
    );
    assert!(!auth.is_valid_user("c1", "reader", "r"));
    assert!(auth.sessions().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_logins_and_role_checks() {
    let auth = Arc::new(AuthService::from_config(&config()));
    let mut handles = Vec::new();
    for n in 0..16 {
        let auth = Arc::clone(&auth);
        handles.push(tokio::spawn(async move {
            let client = format!("client-{n}");
            assert!(auth.is_valid_user(&client, "reader", "r"));
            for _ in 0..50 {
                assert!(auth.user_has_role(&client, "reader", "read"));
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(auth.sessions().len(), 16);
}
