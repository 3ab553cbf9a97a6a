//! Signed access token issuance and validation.
//!
//! Tokens are HMAC-signed JWTs carrying an identity snapshot plus the opaque
//! session token. They are verifiable without a store lookup but only
//! trustworthy for authentication after the session cross-check in the auth
//! service.

use crate::auth::config::AuthConfig;
use crate::auth::error::{AuthError, Denial};
use crate::auth::models::{Claims, User};
use anyhow::anyhow;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;

pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    default_ttl: Duration,
}

impl TokenCodec {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.secret().expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            algorithm: config.algorithm(),
            default_ttl: config.token_ttl(),
        }
    }

    /// Sign a token binding `user` to an existing session.
    ///
    /// Timestamps are truncated to whole Unix seconds. The token expiry and
    /// the session expiry come from the same nominal TTL but are computed
    /// independently; session liveness stays the authoritative check.
    ///
    /// # Errors
    /// Signing failures are infrastructure errors, never authentication
    /// outcomes.
    pub fn issue(
        &self,
        user: &User,
        session_token: &str,
        ttl: Option<Duration>,
    ) -> Result<String, AuthError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            roles: user.roles.clone(),
            session_id: session_token.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|err| AuthError::Store(anyhow!("failed to sign access token: {err}")))
    }

    /// Verify signature and expiry and return the claims.
    ///
    /// Every failure mode (bad signature, malformed structure, expired)
    /// collapses to the same generic outcome; callers must not learn which
    /// check rejected the token.
    ///
    /// # Errors
    /// Returns the generic invalid-credential authentication error.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::Authentication(Denial::InvalidCredential))
    }
}
