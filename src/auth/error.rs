//! Error taxonomy for the auth core.
//!
//! Four domain kinds plus a distinct infrastructure kind. The routing layer
//! maps each kind to a transport status; store failures must never be
//! reported as authentication failures.

use crate::auth::models::Role;
use std::fmt;
use thiserror::Error;

/// Internal reason an authentication attempt was rejected.
///
/// The `Display` output is what callers may show to end users: it never
/// distinguishes expired from tampered credentials, nor which login field
/// was wrong. The precise variant is only for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    MissingCredential,
    InvalidCredential,
    MalformedCredential,
    SessionInvalid,
    UnknownIdentity,
    IdentityDisabled,
    SessionMismatch,
    BadCredentials,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::MissingCredential => "authentication required",
            Self::InvalidCredential => "invalid or expired credential",
            Self::MalformedCredential => "malformed credential",
            Self::SessionInvalid => "session invalid or expired",
            Self::UnknownIdentity => "identity not found",
            Self::IdentityDisabled => "identity disabled",
            Self::SessionMismatch => "session/identity mismatch",
            Self::BadCredentials => "invalid credentials",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed or conflicting input; locally recoverable, message is safe
    /// to surface verbatim.
    #[error("{0}")]
    Validation(String),

    /// Rejected credentials, tokens, or sessions. Surfaced as a generic
    /// "unauthorized".
    #[error("{0}")]
    Authentication(Denial),

    /// Established identity lacks every allowed role. Unlike authentication
    /// failures, the role sets are safe to disclose.
    #[error("access denied: requires one of {required:?}, caller has {actual:?}")]
    Authorization {
        required: Vec<Role>,
        actual: Vec<Role>,
    },

    /// Operation targeted a record that does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Store or crypto infrastructure failure, distinct from the domain
    /// kinds above.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl AuthError {
    /// True for the kinds a routing layer maps to 401.
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_messages_stay_generic() {
        // Expired and tampered credentials must be indistinguishable.
        assert_eq!(
            Denial::InvalidCredential.to_string(),
            "invalid or expired credential"
        );
        // Unknown user and wrong password collapse to the same message.
        assert_eq!(Denial::BadCredentials.to_string(), "invalid credentials");
    }

    #[test]
    fn authorization_error_discloses_role_sets() {
        let err = AuthError::Authorization {
            required: vec![Role::Admin],
            actual: vec![Role::User],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("Admin"));
        assert!(rendered.contains("User"));
    }

    #[test]
    fn store_errors_are_not_authentication() {
        let err = AuthError::from(anyhow::anyhow!("connection reset"));
        assert!(!err.is_authentication());
        assert!(AuthError::Authentication(Denial::SessionInvalid).is_authentication());
    }
}
