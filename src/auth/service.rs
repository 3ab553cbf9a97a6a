//! Login orchestration and request identity resolution.
//!
//! A request's identity runs through a fixed sequence of checkpoints: token
//! extraction, decode, session cross-check, identity load, active check,
//! session/identity match. The first failing checkpoint wins, and every
//! failure after extraction collapses into a generic authentication error so
//! callers cannot probe which check rejected them.

use crate::auth::config::AuthConfig;
use crate::auth::crypto::CredentialHasher;
use crate::auth::error::{AuthError, Denial};
use crate::auth::headers::extract_access_token;
use crate::auth::models::{AuthenticatedUser, Session, User};
use crate::auth::repo::{SessionStore, UserStore};
use crate::auth::session::SessionManager;
use crate::auth::token::TokenCodec;
use axum::http::HeaderMap;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Orchestrates the credential hasher, session manager, token codec, and
/// stores. Everything is pass-the-value: no component holds mutable state
/// across calls beyond the store connections.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
    tokens: TokenCodec,
    hasher: CredentialHasher,
}

impl AuthService {
    #[must_use]
    pub fn new(
        config: &AuthConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            users,
            sessions: SessionManager::new(sessions, config.token_ttl()),
            tokens: TokenCodec::new(config),
            hasher: CredentialHasher::new(),
        }
    }

    /// Swap in a hasher with a non-default work factor.
    #[must_use]
    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    #[must_use]
    pub const fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[must_use]
    pub const fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    /// Authenticate credentials and establish a session.
    ///
    /// The identifier is matched against usernames first, then emails. An
    /// unknown identifier, an inactive account, and a wrong password all
    /// produce the same generic failure; the real reason only reaches the
    /// logs. On success a session row is created and a token bound to it is
    /// signed; if signing fails the session is removed again so no
    /// caller-visible token ever references a half-finished login.
    ///
    /// # Errors
    /// Generic authentication error on bad credentials; infrastructure
    /// errors pass through untouched.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        ttl: Option<Duration>,
    ) -> Result<(User, Session, String), AuthError> {
        let user = match self.users.get_by_username(identifier).await? {
            Some(user) => Some(user),
            None => self.users.get_by_email(identifier).await?,
        };
        let Some(user) = user else {
            debug!("login rejected: unknown identifier");
            return Err(AuthError::Authentication(Denial::BadCredentials));
        };
        if !user.is_active {
            debug!(user_id = user.id, "login rejected: account inactive");
            return Err(AuthError::Authentication(Denial::BadCredentials));
        }
        if !self
            .hasher
            .verify_async(password, &user.password_hash)
            .await?
        {
            debug!(user_id = user.id, "login rejected: password mismatch");
            return Err(AuthError::Authentication(Denial::BadCredentials));
        }

        let session = self.sessions.create(&user, ttl).await?;
        let token = match self.tokens.issue(&user, &session.token, ttl) {
            Ok(token) => token,
            Err(err) => {
                if let Err(cleanup) = self.sessions.delete(&session.token).await {
                    error!("failed to remove session after signing failure: {cleanup}");
                }
                return Err(err);
            }
        };
        debug!(user_id = user.id, session_id = session.id, "login succeeded");
        Ok((user, session, token))
    }

    /// Resolve a signed token to a live identity.
    ///
    /// Runs the checkpoint sequence described in the module docs. The
    /// returned identity is read fresh from the user store; the roles on it
    /// are the issuance-time snapshot from the claims, which is what the
    /// access control gate consumes.
    ///
    /// # Errors
    /// Generic authentication errors for every rejected checkpoint;
    /// infrastructure errors pass through untouched.
    pub async fn resolve_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.tokens.decode(token)?;
        if claims.session_id.is_empty() {
            return Err(AuthError::Authentication(Denial::MalformedCredential));
        }
        let Some(session) = self.sessions.get_by_token(&claims.session_id).await? else {
            return Err(AuthError::Authentication(Denial::SessionInvalid));
        };
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AuthError::Authentication(Denial::MalformedCredential))?;
        let Some(user) = self.users.get_by_id(user_id).await? else {
            return Err(AuthError::Authentication(Denial::UnknownIdentity));
        };
        if !user.is_active {
            return Err(AuthError::Authentication(Denial::IdentityDisabled));
        }
        // A forged or replayed token could point at a session belonging to a
        // different account.
        if session.user_id != user.id {
            return Err(AuthError::Authentication(Denial::SessionMismatch));
        }
        Ok(AuthenticatedUser {
            user,
            roles: claims.roles,
            session_token: session.token,
        })
    }

    /// Resolve the request's identity if it carries one.
    ///
    /// For optional-auth call sites: a missing or rejected credential reads
    /// as anonymous. Store failures still surface; they are not
    /// authentication outcomes.
    ///
    /// # Errors
    /// Infrastructure errors only.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<AuthenticatedUser>, AuthError> {
        let Some(token) = extract_access_token(headers) else {
            return Ok(None);
        };
        match self.resolve_token(&token).await {
            Ok(identity) => Ok(Some(identity)),
            Err(AuthError::Authentication(reason)) => {
                debug!(%reason, "anonymous request: credential rejected");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Resolve the request's identity or fail.
    ///
    /// For required-auth call sites: a missing credential is rejected with
    /// the same taxonomy as an invalid one.
    ///
    /// # Errors
    /// Generic authentication error when unauthenticated; infrastructure
    /// errors pass through untouched.
    pub async fn require(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        let Some(token) = extract_access_token(headers) else {
            return Err(AuthError::Authentication(Denial::MissingCredential));
        };
        self.resolve_token(&token).await
    }

    /// Revoke the session referenced by the request's credential.
    ///
    /// Idempotent by design: an absent carrier, an undecodable token, a
    /// session already gone, and even a store failure all end the same way.
    /// Callers always clear the cookie regardless
    /// ([`clear_access_token_cookie`](crate::auth::headers::clear_access_token_cookie)).
    pub async fn logout(&self, headers: &HeaderMap) {
        let Some(token) = extract_access_token(headers) else {
            return;
        };
        let Ok(claims) = self.tokens.decode(&token) else {
            return;
        };
        if let Err(err) = self.sessions.delete(&claims.session_id).await {
            error!("failed to delete session on logout: {err}");
        }
    }
}
