use crate::auth::{AuthConfig, AuthService};
use crate::cli::actions::Action;
use crate::store::{PgSessionStore, PgUserStore};
use anyhow::{bail, Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

/// Handle the server action: validate configuration, run migrations, wire
/// the auth service against Postgres, and keep sweeping expired sessions.
///
/// The routing layer embeds [`AuthService`] in-process; this binary is the
/// maintenance companion that owns the periodic sweep, which is
/// intentionally kept off the request path.
///
/// # Errors
/// Returns an error if configuration validation, the database connection,
/// or the migrations fail.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server {
        dsn,
        secret,
        algorithm,
        token_ttl_minutes,
        sweep_interval_seconds,
    } = action;

    let dsn = Url::parse(&dsn).context("invalid database DSN")?;
    if !matches!(dsn.scheme(), "postgres" | "postgresql") {
        bail!("unsupported DSN scheme: {}", dsn.scheme());
    }

    let config = AuthConfig::new(secret)?
        .with_algorithm(&algorithm)?
        .with_token_ttl_minutes(token_ttl_minutes)?;

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.as_str())
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let service = AuthService::new(
        &config,
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgSessionStore::new(pool)),
    );

    info!(
        interval_seconds = sweep_interval_seconds,
        ttl_minutes = token_ttl_minutes,
        "session expiry sweeper started"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(sweep_interval_seconds));
    loop {
        ticker.tick().await;
        match service.sessions().sweep_expired().await {
            Ok(0) => {}
            Ok(count) => info!(count, "expired sessions removed"),
            Err(err) => error!("session sweep failed: {err}"),
        }
    }
}
