pub mod server;

use secrecy::SecretString;

/// Actions the CLI can dispatch to.
#[derive(Debug)]
pub enum Action {
    Server {
        dsn: String,
        secret: SecretString,
        algorithm: String,
        token_ttl_minutes: i64,
        sweep_interval_seconds: u64,
    },
}
