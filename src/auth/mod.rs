//! Authentication and authorization core.
//!
//! Control flow: routing layer → [`AuthService`] / [`rbac::require_roles`]
//! → [`SessionManager`] + [`TokenCodec`] → stores. Sessions are the
//! revocation authority: a signed token is only trusted after its session
//! cross-check, so deleting the session invalidates the token immediately,
//! ahead of its own expiry.

pub mod account;
pub mod config;
pub mod crypto;
pub mod error;
pub mod headers;
pub mod models;
pub mod rbac;
pub mod repo;
pub mod service;
pub mod session;
pub mod token;

pub use self::config::AuthConfig;
pub use self::crypto::CredentialHasher;
pub use self::error::{AuthError, Denial};
pub use self::models::{AuthenticatedUser, Claims, Role, Session, User};
pub use self::repo::{SessionStore, UserStore};
pub use self::service::AuthService;
pub use self::session::SessionManager;
pub use self::token::TokenCodec;
