//! Capability interfaces over the durable stores.
//!
//! The core is written only against these traits; any backend that keeps
//! the uniqueness and liveness semantics can satisfy them. Infrastructure
//! failures surface as `anyhow` errors; constraint races on writes surface
//! as explicit outcomes so callers can degrade them to the same error as a
//! failed pre-check.

use crate::auth::models::{Session, User};
use anyhow::Result;
use async_trait::async_trait;

/// Outcome when persisting a new user.
#[derive(Debug)]
pub enum CreateOutcome {
    /// Row inserted; the store-assigned id is filled in.
    Created(User),
    /// A uniqueness constraint on username or email fired.
    Conflict,
}

/// Outcome when updating an existing user.
#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(User),
    /// A uniqueness constraint on username or email fired.
    Conflict,
    /// No row with the given id.
    Missing,
}

/// Durable identity records with uniqueness on username and email.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; the id on the input is ignored.
    async fn create(&self, user: &User) -> Result<CreateOutcome>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Replace the mutable fields of the row with the given id.
    async fn update(&self, id: i64, user: &User) -> Result<UpdateOutcome>;

    /// Mark the row inactive without removing it. Returns whether a row
    /// existed.
    async fn soft_delete(&self, id: i64) -> Result<bool>;

    /// Page through users, optionally filtered on the active flag.
    async fn list(&self, skip: i64, limit: i64, active: Option<bool>) -> Result<Vec<User>>;
}

/// Durable, queryable, expirable session records keyed by the opaque token.
///
/// Liveness (`expires_at` strictly in the future) is evaluated inside every
/// lookup, never cached: an expired-but-present row reads as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session; the id on the input is ignored.
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Fetch a session only if it exists and is live.
    async fn get_by_token(&self, token: &str) -> Result<Option<Session>>;

    /// Fetch the most recently created live session for a user.
    async fn get_latest_by_user(&self, user_id: i64) -> Result<Option<Session>>;

    /// Delete by token; idempotent. Returns whether a row was removed.
    async fn delete(&self, token: &str) -> Result<bool>;

    /// Delete every session owned by a user. Returns whether any row was
    /// removed.
    async fn delete_by_user(&self, user_id: i64) -> Result<bool>;

    /// Bulk-delete rows whose expiry has passed, returning the count.
    async fn delete_expired(&self) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::{CreateOutcome, UpdateOutcome};

    #[test]
    fn outcome_debug_names() {
        assert_eq!(format!("{:?}", CreateOutcome::Conflict), "Conflict");
        assert_eq!(format!("{:?}", UpdateOutcome::Missing), "Missing");
    }
}
