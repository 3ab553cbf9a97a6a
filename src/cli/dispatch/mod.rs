use crate::cli::actions::Action;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Turn parsed arguments into an [`Action`].
///
/// # Errors
/// Returns an error if a required argument is missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        dsn: matches
            .get_one::<String>("dsn")
            .map(ToString::to_string)
            .context("missing required argument: --dsn")?,
        secret: matches
            .get_one::<String>("secret")
            .map(|secret| SecretString::from(secret.clone()))
            .context("missing required argument: --secret")?,
        algorithm: matches
            .get_one::<String>("algorithm")
            .map_or_else(|| "HS256".to_string(), ToString::to_string),
        token_ttl_minutes: matches
            .get_one::<i64>("token-ttl-minutes")
            .copied()
            .unwrap_or(30),
        sweep_interval_seconds: matches
            .get_one::<u64>("sweep-interval-seconds")
            .copied()
            .unwrap_or(300),
    })
}
