//! Session creation, lookup, revocation, and expiry sweeping.

use crate::auth::error::AuthError;
use crate::auth::models::{Session, User};
use crate::auth::repo::SessionStore;
use anyhow::anyhow;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use tracing::debug;

const SESSION_TOKEN_BYTES: usize = 32;

/// Create a new opaque session token.
///
/// 32 bytes from the system RNG, URL-safe base64 without padding. The raw
/// value is handed to the client inside the signed credential and used as
/// the store lookup key.
///
/// # Errors
/// Fails only if the system RNG does.
pub fn generate_session_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| AuthError::Store(anyhow!("failed to generate session token: {err}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Manages session rows through a [`SessionStore`].
///
/// Rows are never mutated: there is no "extend expiry", a new login always
/// creates a new row, and multiple live sessions per user are permitted.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    default_ttl: Duration,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    /// Create and persist a session for `user`.
    ///
    /// `expires_at` is `now + ttl`, falling back to the configured default.
    ///
    /// # Errors
    /// Store failures propagate as infrastructure errors.
    pub async fn create(&self, user: &User, ttl: Option<Duration>) -> Result<Session, AuthError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = Utc::now();
        let session = Session {
            id: 0,
            user_id: user.id,
            token: generate_session_token()?,
            expires_at: now + ttl,
            created_at: now,
        };
        let created = self.store.create(&session).await?;
        debug!(user_id = user.id, session_id = created.id, "session created");
        Ok(created)
    }

    /// Look up a session by token. Expired-but-present rows read as absent.
    ///
    /// # Errors
    /// Store failures propagate as infrastructure errors.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<Session>, AuthError> {
        Ok(self.store.get_by_token(token).await?)
    }

    /// Most recently created live session for a user, if any.
    ///
    /// # Errors
    /// Store failures propagate as infrastructure errors.
    pub async fn get_latest_for_user(&self, user_id: i64) -> Result<Option<Session>, AuthError> {
        Ok(self.store.get_latest_by_user(user_id).await?)
    }

    /// Delete a session by token. Idempotent: deleting an absent token
    /// reports `false` without error, so logout and the expiry sweep can
    /// race safely.
    ///
    /// # Errors
    /// Store failures propagate as infrastructure errors.
    pub async fn delete(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.store.delete(token).await?)
    }

    /// Revoke every session owned by a user.
    ///
    /// # Errors
    /// Store failures propagate as infrastructure errors.
    pub async fn delete_all_for_user(&self, user_id: i64) -> Result<bool, AuthError> {
        Ok(self.store.delete_by_user(user_id).await?)
    }

    /// Bulk-delete expired rows. Intended for periodic maintenance, not the
    /// request path.
    ///
    /// # Errors
    /// Store failures propagate as infrastructure errors.
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        Ok(self.store.delete_expired().await?)
    }
}
