//! Shared SQLite PRAGMA setup
//!
//! Every connection to the leaderboard database goes through
//! `apply_optimized_pragmas` so the writer jobs and API readers agree on
//! journal mode and durability settings.

use rusqlite::Connection;

/// Apply optimized PRAGMAs (WAL, NORMAL, MEMORY, cache, autocheckpoint)
pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    // In-memory databases answer "memory" here; that's fine.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    // Negative value = KiB, so roughly 16 MiB of page cache
    conn.pragma_update(None, "cache_size", -16_000)?;
    conn.pragma_update(None, "wal_autocheckpoint", 1_000)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;

    log::debug!("📊 Applied SQLite PRAGMAs (WAL, NORMAL, MEMORY)");
    Ok(())
}
