//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a
//! type-safe struct.

use anyhow::ensure;
use serde::Deserialize;
use std::time::Duration;

/// Upper bound for the sweep period and staleness threshold (100 years).
const MAX_SWEEP_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Which service this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    /// AccountLedger: `/accounts/**` backed by Postgres
    Accounts,
    /// TransferCoordinator: `/transactions/**` backed by Postgres
    Transactions,
    /// AggregationGateway: `/bff/**`, no database
    Bff,
    /// All three in one process, in-memory storage
    Standalone,
}

impl ServiceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceRole::Accounts => "accounts",
            ServiceRole::Transactions => "transactions",
            ServiceRole::Bff => "bff",
            ServiceRole::Standalone => "standalone",
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `SERVICE_ROLE`: `accounts`, `transactions`, `bff` or `standalone` (default)
/// - `DATABASE_URL`: PostgreSQL connection string, required for `accounts` and `transactions`
/// - `SERVER_PORT`: HTTP server port, defaults to 3000
/// - `USER_SERVICE_URL`, `ACCOUNT_SERVICE_URL`, `TRANSACTION_SERVICE_URL`: peer base URLs
/// - `UPSTREAM_TIMEOUT_MS`: bound on every remote call, defaults to 5000
/// - `LOG_SINK_URL`: HTTP ingest for request/response copies (optional)
/// - `SWEEP_INTERVAL_SECS` / `STALE_AFTER_SECS`: inactivation sweep period and threshold
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_role")]
    pub service_role: ServiceRole,

    pub database_url: Option<String>,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_user_service_url")]
    pub user_service_url: String,

    #[serde(default = "default_account_service_url")]
    pub account_service_url: String,

    #[serde(default = "default_transaction_service_url")]
    pub transaction_service_url: String,

    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    pub log_sink_url: Option<String>,

    #[serde(default = "default_log_topic")]
    pub log_topic: String,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

fn default_role() -> ServiceRole {
    ServiceRole::Standalone
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_user_service_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_account_service_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_transaction_service_url() -> String {
    "http://localhost:8083".to_string()
}

fn default_upstream_timeout_ms() -> u64 {
    5000
}

fn default_log_topic() -> String {
    "logging-topic".to_string()
}

/// Every hour
fn default_sweep_interval_secs() -> u64 {
    3600
}

/// 24 hours
fn default_stale_after_secs() -> u64 {
    86400
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed into its expected type,
    /// or fails [`Config::validate`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the timers and clients cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (1..=MAX_SWEEP_SECS).contains(&self.sweep_interval_secs),
            "SWEEP_INTERVAL_SECS must be between 1 and {MAX_SWEEP_SECS}"
        );
        ensure!(
            self.stale_after_secs <= MAX_SWEEP_SECS,
            "STALE_AFTER_SECS must be at most {MAX_SWEEP_SECS}"
        );
        ensure!(
            self.upstream_timeout_ms > 0,
            "UPSTREAM_TIMEOUT_MS must be greater than 0"
        );
        Ok(())
    }

    /// `DATABASE_URL`, required by the database-backed roles.
    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "DATABASE_URL must be set for the {} role",
                self.service_role.as_str()
            )
        })
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Bounded by [`Config::validate`], so the conversion cannot wrap.
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_after_secs.min(MAX_SWEEP_SECS) as i64)
    }
}
