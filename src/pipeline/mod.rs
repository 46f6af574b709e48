//! # Leaderboard Pipeline
//!
//! Periodically captures the upstream leaderboard, keeps a rolling 24h
//! history of snapshots and serves paginated, category-filtered reads of
//! any retained snapshot.
//!
//! ## Data Flow
//!
//! 1. `IngestJob` fetches one snapshot per cycle (`fetcher`)
//! 2. The snapshot is appended to the log under a fresh `SnapshotId` (`db`)
//! 3. `RetentionJob` drops snapshots older than the horizon
//! 4. `QueryEngine` resolves `(categories, cursor, page)` to 50-entry windows
//!
//! Ids are time-ordered, so "newest" and "older than" are both primary-key
//! range operations.
//!
//! ## Module Organization
//!
//! - `category` - Category tokens and their storage fields
//! - `ids` - Time-ordered snapshot identifiers
//! - `types` - Entries, rankings, snapshots and query results
//! - `fetcher` - Upstream HTTP client and payload decoding
//! - `db` - Append log trait and SQLite implementation
//! - `ingestion` - Fetch/append loop
//! - `retention` - Horizon cleanup loop
//! - `query` - Request validation and windowed reads
//! - `config` - Environment configuration

pub mod category;
pub mod config;
pub mod db;
pub mod fetcher;
pub mod ids;
pub mod ingestion;
pub mod query;
pub mod retention;
pub mod types;

// Re-export commonly used types
pub use category::{Category, EntryKind};
pub use config::TrackerConfig;
pub use db::{AppendLog, SqliteAppendLog, StoreError, WindowRequest};
pub use fetcher::{FetchError, HttpSnapshotFetcher, SnapshotFetcher};
pub use ids::SnapshotId;
pub use ingestion::{CycleOutcome, IngestJob};
pub use query::{LeaderboardRequest, QueryEngine, QueryError};
pub use retention::RetentionJob;
pub use types::{ClanEntry, Leaderboard, PlayerEntry, Ranking, Snapshot};
