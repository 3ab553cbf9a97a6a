//! Postgres-backed stores.
//!
//! Liveness filters and uniqueness live in SQL so every caller gets the
//! same semantics: lookups compare `expires_at` against the database clock,
//! and unique violations (SQLSTATE 23505) are reported as explicit
//! conflict outcomes instead of errors.

use crate::auth::models::{Role, Session, User};
use crate::auth::repo::{CreateOutcome, SessionStore, UpdateOutcome, UserStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::Instrument;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn query_span(operation: &str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn roles_to_labels(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|role| role.as_str().to_string()).collect()
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let id: i64 = row.get("id");
    let labels: Vec<String> = row.get("roles");
    let roles = labels
        .iter()
        .map(|label| {
            Role::parse(label).with_context(|| format!("unknown role '{label}' stored for user {id}"))
        })
        .collect::<Result<Vec<Role>>>()?;
    Ok(User {
        id,
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        roles,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn session_from_row(row: &PgRow) -> Session {
    Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        token: row.get("token"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, roles, is_active, created_at, updated_at";

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, column: &str, bind: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let span = query_span("SELECT", &query);
        let row = sqlx::query(&query)
            .bind(bind)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .with_context(|| format!("failed to lookup user by {column}"))?;
        row.as_ref().map(user_from_row).transpose()
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: &User) -> Result<CreateOutcome> {
        let query = r"
            INSERT INTO users
                (username, email, password_hash, roles, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
        ";
        let span = query_span("INSERT", query);
        let row = sqlx::query(query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(roles_to_labels(&user.roles))
            .bind(user.is_active)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(User {
                id: row.get("id"),
                ..user.clone()
            })),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = query_span("SELECT", &query);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.fetch_one_by("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_one_by("email", email).await
    }

    async fn update(&self, id: i64, user: &User) -> Result<UpdateOutcome> {
        let query = format!(
            r"
            UPDATE users
            SET username = $2,
                email = $3,
                password_hash = $4,
                roles = $5,
                is_active = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING {USER_COLUMNS}
        "
        );
        let span = query_span("UPDATE", &query);
        let row = sqlx::query(&query)
            .bind(id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(roles_to_labels(&user.roles))
            .bind(user.is_active)
            .bind(user.updated_at)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(Some(row)) => Ok(UpdateOutcome::Updated(user_from_row(&row)?)),
            Ok(None) => Ok(UpdateOutcome::Missing),
            Err(err) if is_unique_violation(&err) => Ok(UpdateOutcome::Conflict),
            Err(err) => Err(err).context("failed to update user"),
        }
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        // Rows are never physically removed; the flag preserves audit and
        // referential history.
        let query = "UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1";
        let span = query_span("UPDATE", query);
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to soft-delete user")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, skip: i64, limit: i64, active: Option<bool>) -> Result<Vec<User>> {
        let query = format!(
            r"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($3::boolean IS NULL OR is_active = $3)
            ORDER BY id
            OFFSET $1 LIMIT $2
        "
        );
        let span = query_span("SELECT", &query);
        let rows = sqlx::query(&query)
            .bind(skip)
            .bind(limit)
            .bind(active)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list users")?;
        rows.iter().map(user_from_row).collect()
    }
}

const SESSION_COLUMNS: &str = "id, user_id, token, expires_at, created_at";

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, session: &Session) -> Result<Session> {
        let query = r"
            INSERT INTO sessions (user_id, token, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
        ";
        let span = query_span("INSERT", query);
        let row = sqlx::query(query)
            .bind(session.user_id)
            .bind(&session.token)
            .bind(session.expires_at)
            .bind(session.created_at)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert session")?;
        Ok(Session {
            id: row.get("id"),
            ..session.clone()
        })
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Session>> {
        // Liveness is evaluated here, on every lookup; expired rows read as
        // absent until the sweep removes them.
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE token = $1 AND expires_at > NOW()"
        );
        let span = query_span("SELECT", &query);
        let row = sqlx::query(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session")?;
        Ok(row.as_ref().map(session_from_row))
    }

    async fn get_latest_by_user(&self, user_id: i64) -> Result<Option<Session>> {
        let query = format!(
            r"
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE user_id = $1 AND expires_at > NOW()
            ORDER BY created_at DESC, id DESC
            LIMIT 1
        "
        );
        let span = query_span("SELECT", &query);
        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup latest session")?;
        Ok(row.as_ref().map(session_from_row))
    }

    async fn delete(&self, token: &str) -> Result<bool> {
        let query = "DELETE FROM sessions WHERE token = $1";
        let span = query_span("DELETE", query);
        let result = sqlx::query(query)
            .bind(token)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<bool> {
        let query = "DELETE FROM sessions WHERE user_id = $1";
        let span = query_span("DELETE", query);
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete sessions for user")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self) -> Result<u64> {
        let query = "DELETE FROM sessions WHERE expires_at <= NOW()";
        let span = query_span("DELETE", query);
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to sweep expired sessions")?;
        Ok(result.rows_affected())
    }
}
