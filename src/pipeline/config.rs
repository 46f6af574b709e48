//! Tracker configuration from environment variables

use super::fetcher::DEFAULT_LEADERBOARD_URL;
use super::ingestion::{DEFAULT_FETCH_BACKOFF, DEFAULT_INGEST_INTERVAL};
use super::retention::{DEFAULT_RETENTION_HORIZON, DEFAULT_RETENTION_INTERVAL};
use std::env;
use std::time::Duration;

/// Configuration for the tracker runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Path to SQLite database file
    pub db_path: String,

    /// HTTP listen host
    pub host: String,

    /// HTTP listen port
    pub port: u16,

    /// Upstream leaderboard endpoint
    pub upstream_url: String,

    /// Timeout for one upstream request
    pub fetch_timeout: Duration,

    /// Delay between successful ingest cycles
    pub ingest_interval: Duration,

    /// Delay after a failed fetch
    pub ingest_backoff: Duration,

    /// Delay between retention cycles
    pub retention_interval: Duration,

    /// Age after which snapshots are deleted
    pub retention_horizon: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_path: "leaderboard.db".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            upstream_url: DEFAULT_LEADERBOARD_URL.to_string(),
            fetch_timeout: Duration::from_secs(30),
            ingest_interval: DEFAULT_INGEST_INTERVAL,
            ingest_backoff: DEFAULT_FETCH_BACKOFF,
            retention_interval: DEFAULT_RETENTION_INTERVAL,
            retention_horizon: DEFAULT_RETENTION_HORIZON,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `LEADERBOARD_DB_PATH` (default: leaderboard.db)
    /// - `HOST` (default: 0.0.0.0)
    /// - `PORT` (default: 8080)
    /// - `UPSTREAM_URL` (default: the public BattleBit leaderboard endpoint)
    /// - `FETCH_TIMEOUT_SECS` (default: 30)
    /// - `INGEST_INTERVAL_SECS` (default: 60)
    /// - `INGEST_BACKOFF_SECS` (default: 10)
    /// - `RETENTION_INTERVAL_SECS` (default: 900)
    /// - `RETENTION_HORIZON_HOURS` (default: 24)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_source<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            db_path: lookup("LEADERBOARD_DB_PATH")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.db_path),

            host: lookup("HOST")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.host),

            port: lookup("PORT")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.port),

            upstream_url: lookup("UPSTREAM_URL")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.upstream_url),

            fetch_timeout: secs("FETCH_TIMEOUT_SECS", defaults.fetch_timeout),
            ingest_interval: secs("INGEST_INTERVAL_SECS", defaults.ingest_interval),
            ingest_backoff: secs("INGEST_BACKOFF_SECS", defaults.ingest_backoff),
            retention_interval: secs("RETENTION_INTERVAL_SECS", defaults.retention_interval),

            retention_horizon: lookup("RETENTION_HORIZON_HOURS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(|hours| Duration::from_secs(hours.saturating_mul(3600)))
                .unwrap_or(defaults.retention_horizon),
        }
    }

    /// `host:port` for the HTTP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
