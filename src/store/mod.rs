//! Storage backends satisfying the capability interfaces in
//! [`crate::auth::repo`].

pub mod memory;
pub mod postgres;

pub use self::memory::{MemorySessionStore, MemoryUserStore};
pub use self::postgres::{PgSessionStore, PgUserStore};
