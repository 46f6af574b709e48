//! Retention job - bounds the append log to a rolling horizon
//!
//! Every interval, compute the smallest id that could have been minted at
//! `now - horizon` and delete everything below it. Ids embed their creation
//! second, so this is a single range delete on the primary key.
//!
//! Deletes are best effort: failures are logged and the next cycle tries
//! again. Concurrent appends only ever add ids above the cutoff, so the job
//! needs no coordination with the ingest job.

use super::db::{AppendLog, StoreError};
use super::ids::SnapshotId;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_RETENTION_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_RETENTION_HORIZON: Duration = Duration::from_secs(24 * 60 * 60);

pub struct RetentionJob {
    append_log: Arc<dyn AppendLog>,
    interval: Duration,
    horizon: Duration,
}

impl RetentionJob {
    pub fn new(append_log: Arc<dyn AppendLog>) -> Self {
        Self {
            append_log,
            interval: DEFAULT_RETENTION_INTERVAL,
            horizon: DEFAULT_RETENTION_HORIZON,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_horizon(mut self, horizon: Duration) -> Self {
        self.horizon = horizon;
        self
    }

    /// Lowest id that survives a cycle run at `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> SnapshotId {
        let horizon_secs = i64::try_from(self.horizon.as_secs()).unwrap_or(i64::MAX);
        let oldest_kept = DateTime::from_timestamp(now.timestamp().saturating_sub(horizon_secs), 0)
            .unwrap_or_default();
        SnapshotId::floor(oldest_kept)
    }

    /// Delete everything older than the horizon as of `now`
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.append_log.delete_older_than(self.cutoff(now)).await
    }

    /// Delete everything older than the horizon as of the current time
    pub async fn run_once(&self) -> Result<usize, StoreError> {
        self.run_once_at(Utc::now()).await
    }

    /// Run cycles until `shutdown` is cancelled; the first cycle runs immediately
    pub async fn run(self, shutdown: CancellationToken) {
        log::info!(
            "⏰ Starting retention job (interval: {:?}, horizon: {:?})",
            self.interval,
            self.horizon
        );

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            match self.run_once().await {
                Ok(0) => log::debug!("Retention: nothing to remove"),
                Ok(removed) => log::info!("🧹 Removed {} expired snapshots", removed),
                Err(e) => log::error!("❌ Error removing old snapshots: {}", e),
            }
        }

        log::info!("🛑 Retention job stopped");
    }
}
