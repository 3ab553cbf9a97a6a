//! Auth configuration, constructed once at process start.
//!
//! No component reads the environment at runtime; the CLI collects the
//! values and passes this struct by reference into each constructor.

use anyhow::{bail, Result};
use jsonwebtoken::Algorithm;
use secrecy::{ExposeSecret, SecretString};

pub const MIN_SECRET_LENGTH: usize = 32;
const MIN_TOKEN_TTL_MINUTES: i64 = 1;
const MAX_TOKEN_TTL_MINUTES: i64 = 1440;
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Signing secret, signing algorithm, and default token/session TTL.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    secret: SecretString,
    algorithm: Algorithm,
    token_ttl_minutes: i64,
}

impl AuthConfig {
    /// # Errors
    /// Rejects secrets shorter than [`MIN_SECRET_LENGTH`] characters.
    pub fn new(secret: SecretString) -> Result<Self> {
        if secret.expose_secret().len() < MIN_SECRET_LENGTH {
            bail!("signing secret must be at least {MIN_SECRET_LENGTH} characters");
        }
        Ok(Self {
            secret,
            algorithm: Algorithm::HS256,
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
        })
    }

    /// # Errors
    /// Only the HMAC family is supported with a shared secret.
    pub fn with_algorithm(mut self, name: &str) -> Result<Self> {
        self.algorithm = match name {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => bail!("unsupported signing algorithm: {other}"),
        };
        Ok(self)
    }

    /// # Errors
    /// The TTL is bounded to 1..=1440 minutes.
    pub fn with_token_ttl_minutes(mut self, minutes: i64) -> Result<Self> {
        if !(MIN_TOKEN_TTL_MINUTES..=MAX_TOKEN_TTL_MINUTES).contains(&minutes) {
            bail!(
                "token ttl must be between {MIN_TOKEN_TTL_MINUTES} and {MAX_TOKEN_TTL_MINUTES} minutes"
            );
        }
        self.token_ttl_minutes = minutes;
        Ok(self)
    }

    pub(crate) fn secret(&self) -> &SecretString {
        &self.secret
    }

    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub const fn token_ttl_minutes(&self) -> i64 {
        self.token_ttl_minutes
    }

    /// Default TTL applied to both sessions and signed tokens at issuance.
    #[must_use]
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes)
    }

    /// Cookie Max-Age matching the token TTL.
    #[must_use]
    pub const fn cookie_max_age_seconds(&self) -> i64 {
        self.token_ttl_minutes * 60
    }
}
