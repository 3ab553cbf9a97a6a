//! Domain entities for identity and session tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role labels recognized by the access control gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Parse a stored role label. Returns `None` for anything outside the
    /// closed set.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "super_admin" => Some(Self::SuperAdmin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity record. The id is assigned by the user store on creation.
///
/// Invariant: `roles` is never empty. Accounts are soft-deleted by flipping
/// `is_active`; rows are not physically removed by normal operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Server-side proof that a login succeeded and has not been revoked.
///
/// `token` is the opaque lookup key presented back by clients inside the
/// signed credential; it is distinct from the signed token itself. A session
/// is live iff `expires_at` is strictly in the future, re-checked on every
/// lookup. Rows are never mutated in place; a new login creates a new row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Claim set carried by the signed access token.
///
/// `exp` and `iat` are integer Unix seconds; fractional precision is dropped
/// intentionally so tokens verify identically across implementations. The
/// roles are a snapshot taken at issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
    /// Opaque session token; empty when a foreign token omits the claim,
    /// which resolution rejects as malformed.
    #[serde(default)]
    pub session_id: String,
    pub exp: i64,
    pub iat: i64,
}

/// Outcome of a successful identity resolution.
///
/// `user` is the live store row; `roles` is the snapshot from the token
/// claims, which is what authorization decisions consume. The two can
/// disagree after an administrative role change until the client logs in
/// again.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub roles: Vec<Role>,
    pub session_token: String,
}
