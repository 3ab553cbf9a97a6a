//! # Matiz auth core
//!
//! Authentication and authorization for the Matiz paint catalog backend:
//! password login, server-tracked sessions bound into signed bearer tokens,
//! token validation cross-checked against the revocable session store, and
//! role-based access control for administrative operations.
//!
//! ## Sessions and tokens
//!
//! A login creates a session row keyed by an opaque high-entropy token,
//! then signs a JWT that carries the identity snapshot plus that session
//! token. The JWT alone is never enough: every resolution re-checks the
//! session, so deleting the row (logout, administrative revocation, expiry
//! sweep) invalidates outstanding tokens immediately.
//!
//! ## Stores
//!
//! Core logic is written against the [`auth::repo::UserStore`] and
//! [`auth::repo::SessionStore`] interfaces. [`store::postgres`] is the
//! production backend; [`store::memory`] backs the test suites.

pub mod auth;
pub mod cli;
pub mod store;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
