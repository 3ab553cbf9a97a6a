//! In-memory store fakes.
//!
//! Same observable semantics as the Postgres backends — uniqueness
//! conflicts, liveness filtering, idempotent deletes — over mutexed maps.
//! Used by the test suites; nothing here talks to a network.

use crate::auth::models::{Session, User};
use crate::auth::repo::{CreateOutcome, SessionStore, UpdateOutcome, UserStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock only means another test thread panicked mid-write;
    // the data is still usable for these fakes.
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Default)]
struct UserTable {
    rows: HashMap<i64, User>,
    next_id: i64,
}

pub struct MemoryUserStore {
    inner: Mutex<UserTable>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(UserTable::default()),
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: &User) -> Result<CreateOutcome> {
        let mut table = lock(&self.inner);
        let conflict = table
            .rows
            .values()
            .any(|row| row.username == user.username || row.email == user.email);
        if conflict {
            return Ok(CreateOutcome::Conflict);
        }
        table.next_id += 1;
        let created = User {
            id: table.next_id,
            ..user.clone()
        };
        table.rows.insert(created.id, created.clone());
        Ok(CreateOutcome::Created(created))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(lock(&self.inner).rows.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(lock(&self.inner)
            .rows
            .values()
            .find(|row| row.username == username)
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(lock(&self.inner)
            .rows
            .values()
            .find(|row| row.email == email)
            .cloned())
    }

    async fn update(&self, id: i64, user: &User) -> Result<UpdateOutcome> {
        let mut table = lock(&self.inner);
        if !table.rows.contains_key(&id) {
            return Ok(UpdateOutcome::Missing);
        }
        let conflict = table.rows.values().any(|row| {
            row.id != id && (row.username == user.username || row.email == user.email)
        });
        if conflict {
            return Ok(UpdateOutcome::Conflict);
        }
        let updated = User {
            id,
            ..user.clone()
        };
        table.rows.insert(id, updated.clone());
        Ok(UpdateOutcome::Updated(updated))
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        let mut table = lock(&self.inner);
        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(false);
        };
        row.is_active = false;
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn list(&self, skip: i64, limit: i64, active: Option<bool>) -> Result<Vec<User>> {
        let table = lock(&self.inner);
        let mut rows: Vec<User> = table
            .rows
            .values()
            .filter(|row| active.is_none_or(|wanted| row.is_active == wanted))
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }
}

#[derive(Default)]
struct SessionTable {
    rows: HashMap<i64, Session>,
    next_id: i64,
}

pub struct MemorySessionStore {
    inner: Mutex<SessionTable>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SessionTable::default()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: &Session) -> Result<Session> {
        let mut table = lock(&self.inner);
        table.next_id += 1;
        let created = Session {
            id: table.next_id,
            ..session.clone()
        };
        table.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Session>> {
        let now = Utc::now();
        Ok(lock(&self.inner)
            .rows
            .values()
            .find(|row| row.token == token && row.expires_at > now)
            .cloned())
    }

    async fn get_latest_by_user(&self, user_id: i64) -> Result<Option<Session>> {
        let now = Utc::now();
        Ok(lock(&self.inner)
            .rows
            .values()
            .filter(|row| row.user_id == user_id && row.expires_at > now)
            .max_by_key(|row| (row.created_at, row.id))
            .cloned())
    }

    async fn delete(&self, token: &str) -> Result<bool> {
        let mut table = lock(&self.inner);
        let id = table
            .rows
            .values()
            .find(|row| row.token == token)
            .map(|row| row.id);
        Ok(id.and_then(|id| table.rows.remove(&id)).is_some())
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<bool> {
        let mut table = lock(&self.inner);
        let before = table.rows.len();
        table.rows.retain(|_, row| row.user_id != user_id);
        Ok(table.rows.len() < before)
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut table = lock(&self.inner);
        let before = table.rows.len();
        table.rows.retain(|_, row| row.expires_at > now);
        Ok((before - table.rows.len()) as u64)
    }
}
