//! Append log: insert-only, time-ordered store of snapshots
//!
//! The store capability the pipeline needs is small:
//! - `append` a snapshot under a fresh, time-ordered id
//! - `window` one snapshot: select it (newest or by id) and slice the
//!   requested rankings inside the store
//! - `delete_older_than` a cutoff id
//!
//! ## SQLite layout
//!
//! - `snapshots` - one row per snapshot, keyed by the 12-byte id (BLOB,
//!   memcmp order = creation order)
//! - `snapshot_categories` - which categories a snapshot holds, so an empty
//!   ranking is distinguishable from a missing one
//! - `snapshot_entries` - one row per ranking entry with its rank; windows
//!   are `ORDER BY rank LIMIT ? OFFSET ?` over the primary key
//!
//! Rows are never updated. Writes happen in one transaction per snapshot, so
//! a reader never observes a partially written snapshot.

use super::category::Category;
use super::ids::SnapshotId;
use super::types::{Leaderboard, Ranking, Snapshot};
use crate::sqlite_pragma::apply_optimized_pragmas;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
    id          BLOB PRIMARY KEY,
    created_at  INTEGER NOT NULL
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS snapshot_categories (
    snapshot_id BLOB NOT NULL,
    field       TEXT NOT NULL,
    entry_count INTEGER NOT NULL,
    PRIMARY KEY (snapshot_id, field)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS snapshot_entries (
    snapshot_id BLOB NOT NULL,
    field       TEXT NOT NULL,
    rank        INTEGER NOT NULL,
    entry       TEXT NOT NULL,
    PRIMARY KEY (snapshot_id, field, rank)
) WITHOUT ROWID;
"#;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database connection lock poisoned")]
    LockPoisoned,

    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A windowed read against one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRequest {
    /// Concrete categories to slice. Meta categories are skipped.
    pub categories: Vec<Category>,
    /// Exact snapshot to read; `None` selects the newest one
    pub cursor: Option<SnapshotId>,
    pub offset: usize,
    pub limit: usize,
}

/// Store capability used by the ingest job, retention job and query engine
#[async_trait]
pub trait AppendLog: Send + Sync {
    /// Insert a snapshot under a freshly minted id and return that id
    async fn append(&self, snapshot: &Snapshot) -> Result<SnapshotId, StoreError>;

    /// Select one snapshot and slice the requested rankings
    ///
    /// Returns `Ok(None)` when the store is empty or the cursor matches no row.
    async fn window(&self, request: &WindowRequest) -> Result<Option<Leaderboard>, StoreError>;

    /// Delete every snapshot whose id sorts below `cutoff`; returns how many
    async fn delete_older_than(&self, cutoff: SnapshotId) -> Result<usize, StoreError>;
}

/// SQLite implementation of `AppendLog`
///
/// All statements run on the blocking pool through one shared connection.
pub struct SqliteAppendLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAppendLog {
    /// Open (or create) the database file and make sure the schema exists
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Private in-memory database (tests, dry runs)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        apply_optimized_pragmas(&conn)?;
        conn.execute_batch(SCHEMA)?;

        log::info!("✅ Snapshot schema ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a snapshot under a caller-chosen id
    ///
    /// `append` uses this with a fresh id; tests use it to backdate rows.
    pub fn insert_with_id(&self, id: SnapshotId, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        insert_snapshot(&mut *conn, id, snapshot)
    }

    /// Number of snapshots currently stored
    pub fn snapshot_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            op(&mut *guard)
        })
        .await?
    }
}

#[async_trait]
impl AppendLog for SqliteAppendLog {
    async fn append(&self, snapshot: &Snapshot) -> Result<SnapshotId, StoreError> {
        let snapshot = snapshot.clone();
        self.with_conn(move |conn| {
            let id = SnapshotId::new();
            insert_snapshot(conn, id, &snapshot)?;
            Ok(id)
        })
        .await
    }

    async fn window(&self, request: &WindowRequest) -> Result<Option<Leaderboard>, StoreError> {
        let request = request.clone();
        self.with_conn(move |conn| read_window(conn, &request)).await
    }

    async fn delete_older_than(&self, cutoff: SnapshotId) -> Result<usize, StoreError> {
        self.with_conn(move |conn| delete_before(conn, cutoff)).await
    }
}

fn insert_snapshot(conn: &mut Connection, id: SnapshotId, snapshot: &Snapshot) -> Result<(), StoreError> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO snapshots (id, created_at) VALUES (?1, ?2)",
        params![id, id.timestamp().timestamp()],
    )?;

    {
        let mut category_stmt = tx.prepare(
            "INSERT INTO snapshot_categories (snapshot_id, field, entry_count) VALUES (?1, ?2, ?3)",
        )?;
        let mut entry_stmt = tx.prepare(
            "INSERT INTO snapshot_entries (snapshot_id, field, rank, entry) VALUES (?1, ?2, ?3, ?4)",
        )?;

        for (category, ranking) in snapshot.rankings() {
            let Some(field) = category.storage_field() else {
                continue;
            };

            category_stmt.execute(params![id, field, ranking.len() as i64])?;
            for (rank, entry) in ranking.entries_json()?.iter().enumerate() {
                entry_stmt.execute(params![id, field, rank as i64, entry])?;
            }
        }
    }

    tx.commit()?;

    log::debug!("✅ Inserted snapshot {} ({} categories)", id, snapshot.rankings().count());
    Ok(())
}

fn read_window(conn: &Connection, request: &WindowRequest) -> Result<Option<Leaderboard>, StoreError> {
    let id: Option<SnapshotId> = match request.cursor {
        Some(cursor) => conn
            .query_row("SELECT id FROM snapshots WHERE id = ?1", params![cursor], |row| row.get(0))
            .optional()?,
        None => conn
            .query_row("SELECT id FROM snapshots ORDER BY id DESC LIMIT 1", [], |row| row.get(0))
            .optional()?,
    };

    let Some(id) = id else {
        return Ok(None);
    };

    let mut present_stmt =
        conn.prepare_cached("SELECT 1 FROM snapshot_categories WHERE snapshot_id = ?1 AND field = ?2")?;
    let mut slice_stmt = conn.prepare_cached(
        "SELECT entry FROM snapshot_entries
         WHERE snapshot_id = ?1 AND field = ?2
         ORDER BY rank ASC
         LIMIT ?3 OFFSET ?4",
    )?;

    let mut leaderboard = Leaderboard::for_snapshot(id);

    for category in &request.categories {
        let (Some(field), Some(kind)) = (category.storage_field(), category.entry_kind()) else {
            continue;
        };

        if !present_stmt.exists(params![id, field])? {
            continue;
        }

        let rows = slice_stmt
            .query_map(
                params![id, field, request.limit as i64, request.offset as i64],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        leaderboard
            .windows
            .insert(*category, Ranking::from_entries_json(kind, &rows)?);
    }

    Ok(Some(leaderboard))
}

fn delete_before(conn: &mut Connection, cutoff: SnapshotId) -> Result<usize, StoreError> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM snapshot_entries WHERE snapshot_id < ?1", params![cutoff])?;
    tx.execute("DELETE FROM snapshot_categories WHERE snapshot_id < ?1", params![cutoff])?;
    let removed = tx.execute("DELETE FROM snapshots WHERE id < ?1", params![cutoff])?;

    tx.commit()?;
    Ok(removed)
}
