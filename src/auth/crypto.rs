//! Password hashing with salted, cost-parameterized Argon2id.
//!
//! Each hash call draws a fresh 16-byte salt and embeds it in the PHC output
//! string, so no salt is stored separately. Verification never logs or
//! returns the plaintext.

use crate::auth::error::AuthError;
use anyhow::anyhow;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};

const SALT_BYTES: usize = 16;

/// One-way credential hasher.
///
/// The work factor is fixed at construction; verification cost follows the
/// parameters embedded in each stored hash.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Build a hasher with an explicit work factor.
    ///
    /// # Errors
    /// Returns a validation error if the parameters are outside the ranges
    /// the algorithm accepts.
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|err| AuthError::Validation(format!("invalid hashing parameters: {err}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password into a PHC string.
    ///
    /// # Errors
    /// Returns an infrastructure error if the system RNG or the hash
    /// computation fails.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let mut salt_bytes = [0u8; SALT_BYTES];
        getrandom::getrandom(&mut salt_bytes)
            .map_err(|err| AuthError::Store(anyhow!("failed to generate salt: {err}")))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|err| AuthError::Store(anyhow!("failed to encode salt: {err}")))?;
        let phc = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| AuthError::Store(anyhow!("failed to hash password: {err}")))?
            .to_string();
        Ok(phc)
    }

    /// Check a plaintext password against a stored PHC string.
    ///
    /// Unparseable hashes verify as false rather than erroring, so a
    /// corrupted row degrades to a failed login instead of a crash.
    #[must_use]
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        if let Ok(parsed) = PasswordHash::new(hash) {
            self.argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        } else {
            false
        }
    }

    /// [`hash`](Self::hash) on the blocking pool, keeping the CPU-bound work
    /// off cooperative worker threads.
    ///
    /// # Errors
    /// Same as [`hash`](Self::hash), plus task join failures.
    pub async fn hash_async(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| AuthError::Store(anyhow!("hashing task failed: {err}")))?
    }

    /// [`verify`](Self::verify) on the blocking pool.
    ///
    /// # Errors
    /// Fails only if the task cannot be joined.
    pub async fn verify_async(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|err| AuthError::Store(anyhow!("verification task failed: {err}")))
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new()
    }
}
