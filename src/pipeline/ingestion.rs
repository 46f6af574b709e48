//! Ingest job - polls the upstream leaderboard and appends snapshots
//!
//! Cycle:
//! 1. Fetch one snapshot
//! 2. On success, append it to the log and wait the regular interval.
//!    A failed append is logged and dropped; the schedule is unaffected.
//! 3. On fetch failure, log it and wait the (shorter) fixed backoff
//!
//! Cycles are sequential, so there is at most one append in flight. The job
//! never stops on an error; it ends only when its cancellation token fires.

use super::db::AppendLog;
use super::fetcher::SnapshotFetcher;
use super::ids::SnapshotId;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_INGEST_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_FETCH_BACKOFF: Duration = Duration::from_secs(10);

/// What one ingest cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Stored(SnapshotId),
    /// Fetched, but the append failed
    StoreFailed,
    FetchFailed,
}

pub struct IngestJob {
    fetcher: Arc<dyn SnapshotFetcher>,
    append_log: Arc<dyn AppendLog>,
    interval: Duration,
    backoff: Duration,
}

impl IngestJob {
    pub fn new(fetcher: Arc<dyn SnapshotFetcher>, append_log: Arc<dyn AppendLog>) -> Self {
        Self {
            fetcher,
            append_log,
            interval: DEFAULT_INGEST_INTERVAL,
            backoff: DEFAULT_FETCH_BACKOFF,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay before the next cycle
    pub fn delay_after(&self, outcome: CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::FetchFailed => self.backoff,
            CycleOutcome::Stored(_) | CycleOutcome::StoreFailed => self.interval,
        }
    }

    /// Run exactly one fetch/append cycle
    pub async fn run_once(&self) -> CycleOutcome {
        let started = Instant::now();

        let snapshot = match self.fetcher.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!(
                    "⚠️  Non fatal error fetching leaderboard, retrying in {:?}: {}",
                    self.backoff,
                    e
                );
                return CycleOutcome::FetchFailed;
            }
        };

        match self.append_log.append(&snapshot).await {
            Ok(id) => {
                log::info!(
                    "✅ Stored snapshot {} ({} categories, {:?})",
                    id,
                    snapshot.rankings().count(),
                    started.elapsed()
                );
                CycleOutcome::Stored(id)
            }
            Err(e) => {
                log::error!("❌ Error inserting leaderboard snapshot: {}", e);
                CycleOutcome::StoreFailed
            }
        }
    }

    /// Run cycles until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        log::info!(
            "🚀 Starting ingest job (interval: {:?}, backoff: {:?})",
            self.interval,
            self.backoff
        );

        loop {
            let outcome = tokio::select! {
                _ = shutdown.cancelled() => break,
                outcome = self.run_once() => outcome,
            };

            let delay = self.delay_after(outcome);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        log::info!("🛑 Ingest job stopped");
    }
}
