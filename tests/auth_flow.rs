//! End-to-end flows over the in-memory stores: register, login, resolve,
//! role gating, grants, revocation, and expiry.

use anyhow::Result;
use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use matiz::auth::account::{grant_admin, register_user, NewUser};
use matiz::auth::headers::{access_token_cookie, clear_access_token_cookie};
use matiz::auth::rbac::require_roles;
use matiz::auth::{AuthConfig, AuthError, AuthService, CredentialHasher, Role};
use matiz::store::{MemorySessionStore, MemoryUserStore};
use secrecy::SecretString;
use std::sync::Arc;

fn service() -> AuthService {
    let config = AuthConfig::new(SecretString::from(
        "integration-test-secret-0123456789abcdef",
    ))
    .expect("config");
    AuthService::new(
        &config,
        Arc::new(MemoryUserStore::new()),
        Arc::new(MemorySessionStore::new()),
    )
    .with_hasher(CredentialHasher::with_params(8 * 1024, 1, 1).expect("params"))
}

fn cookie_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        COOKIE,
        HeaderValue::from_str(&format!("access_token={token}")).expect("header"),
    );
    headers
}

async fn register_alice(service: &AuthService) -> Result<i64> {
    let user = register_user(
        service.users(),
        service.hasher(),
        NewUser {
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            password: "password123".to_string(),
            roles: None,
        },
    )
    .await?;
    Ok(user.id)
}

#[tokio::test]
async fn role_grants_only_reach_freshly_issued_tokens() -> Result<()> {
    let service = service();
    let alice_id = register_alice(&service).await?;

    // Login and resolve through the cookie carrier.
    let (_, _, token) = service.login("alice", "password123", None).await?;
    let identity = service.require(&cookie_headers(&token)).await?;
    assert_eq!(identity.roles, vec![Role::User]);

    // Admin-gated work is forbidden for a plain user.
    let err = require_roles(identity, &[Role::Admin]).expect_err("plain user must be rejected");
    assert!(matches!(err, AuthError::Authorization { .. }));

    // Grant admin administratively.
    let granted = grant_admin(service.users(), alice_id).await?;
    assert_eq!(granted.roles, vec![Role::User, Role::Admin]);

    // The pre-grant token still resolves, but its role snapshot predates
    // the grant: the gate must keep rejecting it.
    let stale = service.require(&cookie_headers(&token)).await?;
    assert_eq!(stale.roles, vec![Role::User]);
    assert_eq!(stale.user.roles, vec![Role::User, Role::Admin]);
    assert!(require_roles(stale, &[Role::Admin]).is_err());

    // A fresh login picks up the new snapshot and passes.
    let (_, _, fresh_token) = service.login("alice", "password123", None).await?;
    let fresh = service.require(&cookie_headers(&fresh_token)).await?;
    let passed = require_roles(fresh, &[Role::Admin]).expect("fresh token must pass");
    assert_eq!(passed.roles, vec![Role::User, Role::Admin]);
    Ok(())
}

#[tokio::test]
async fn logout_clears_cookie_and_revokes_session() -> Result<()> {
    let service = service();
    register_alice(&service).await?;
    let (_, _, token) = service.login("alice", "password123", None).await?;
    let headers = cookie_headers(&token);

    assert!(service.authenticate(&headers).await?.is_some());
    service.logout(&headers).await;
    assert!(service.authenticate(&headers).await?.is_none());

    // The carrier is cleared unconditionally, even on a second logout.
    service.logout(&headers).await;
    let cleared = clear_access_token_cookie();
    assert!(cleared.to_str()?.contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn short_lived_login_expires_end_to_end() -> Result<()> {
    let service = service();
    register_alice(&service).await?;
    let (_, session, token) = service
        .login("alice", "password123", Some(chrono::Duration::milliseconds(80)))
        .await?;

    assert!(service
        .sessions()
        .get_by_token(&session.token)
        .await?
        .is_some());
    assert!(service.resolve_token(&token).await.is_ok());

    tokio::time::sleep(std::time::Duration::from_millis(120)).await;

    // The session row no longer answers lookups and the token stops
    // resolving, before any sweep has run.
    assert!(service
        .sessions()
        .get_by_token(&session.token)
        .await?
        .is_none());
    assert!(service.resolve_token(&token).await.is_err());

    assert_eq!(service.sessions().sweep_expired().await?, 1);
    Ok(())
}

#[tokio::test]
async fn issued_cookie_matches_token_ttl() -> Result<()> {
    let config = AuthConfig::new(SecretString::from(
        "integration-test-secret-0123456789abcdef",
    ))?
    .with_token_ttl_minutes(15)?;

    let cookie = access_token_cookie("some-token", config.cookie_max_age_seconds())?;
    let value = cookie.to_str()?;
    assert!(value.contains("Max-Age=900"));
    assert!(value.contains("HttpOnly"));
    assert!(value.contains("SameSite=Lax"));
    assert!(value.contains("Path=/"));
    Ok(())
}

#[tokio::test]
async fn administrative_revocation_kills_every_session() -> Result<()> {
    let service = service();
    let alice_id = register_alice(&service).await?;

    let (_, _, first) = service.login("alice", "password123", None).await?;
    let (_, _, second) = service.login("alice", "password123", None).await?;
    assert!(service.resolve_token(&first).await.is_ok());
    assert!(service.resolve_token(&second).await.is_ok());

    assert!(service.sessions().delete_all_for_user(alice_id).await?);
    assert!(service.resolve_token(&first).await.is_err());
    assert!(service.resolve_token(&second).await.is_err());
    Ok(())
}
