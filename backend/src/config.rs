use std::env;
use std::time::Duration;

use crate::auth::jwt::TOKEN_TTL_HOURS;

/// Delay before a requester's creation notification fires
pub const DEFAULT_NOTIFY_DELAY_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    /// Postgres connection string; the in-memory store is used when unset
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// AES-256 key for remote-access secrets (exactly 32 bytes)
    pub encryption_key: String,
    pub notify_delay: Duration,
    pub session_ttl: chrono::Duration,
    /// Load the demo units, sectors, users and tickets on startup
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let encryption_key = env::var("ENCRYPTION_KEY").unwrap_or_else(|_| {
            tracing::warn!("ENCRYPTION_KEY not set, using default key for development only");
            "CHANGE_THIS_IN_PRODUCTION_32_BYT".to_string()
        });
        if encryption_key.len() != 32 {
            anyhow::bail!("ENCRYPTION_KEY must be exactly 32 bytes");
        }

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using default (insecure for production)");
            "your-secret-key-change-in-production".to_string()
        });

        Ok(Config {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            jwt_secret,
            encryption_key,
            notify_delay: Duration::from_millis(
                env::var("NOTIFY_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_NOTIFY_DELAY_MS),
            ),
            session_ttl: chrono::Duration::hours(
                env::var("SESSION_TTL_HOURS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(TOKEN_TTL_HOURS),
            ),
            seed_demo_data: env::var("SEED_DEMO_DATA")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        })
    }

    /// Configuration used by the test suite: in-memory store, short delay.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".to_string(),
            database_url: None,
            jwt_secret: "test_secret_key_for_testing_only".to_string(),
            encryption_key: "test_key_32_bytes_long_exactly!!".to_string(),
            notify_delay: Duration::from_millis(50),
            session_ttl: chrono::Duration::hours(TOKEN_TTL_HOURS),
            seed_demo_data: true,
        }
    }
}
