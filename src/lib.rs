//! Leaderboard tracker
//!
//! Captures the BattleBit leaderboard on a schedule, retains a rolling
//! window of snapshots in SQLite and serves paginated views over HTTP.

pub mod api;
pub mod pipeline;
pub mod sqlite_pragma;
