//! Perpetual sweep loop.
//!
//! Each sweep takes a snapshot of the known feeds and syncs them one at a
//! time with a short spacing between them, so outbound requests never burst.
//! Feeds added or removed mid-sweep show up in the next sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

use crate::store::Store;
use crate::sync::SyncEngine;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between full sweeps over all feeds.
    pub sweep_interval: Duration,
    /// Spacing between consecutive feeds within one sweep.
    pub feed_spacing: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            feed_spacing: Duration::from_secs(1),
        }
    }
}

/// Counts for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub synced: usize,
    pub failed: usize,
}

pub struct Scheduler {
    engine: Arc<SyncEngine>,
    store: Arc<dyn Store + Send + Sync>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        engine: Arc<SyncEngine>,
        store: Arc<dyn Store + Send + Sync>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            engine,
            store,
            config,
        }
    }

    /// Run sweeps until `shutdown` flips to true. The feed currently in
    /// flight finishes before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            sweep_interval_secs = self.config.sweep_interval.as_secs(),
            feed_spacing_secs = self.config.feed_spacing.as_secs(),
            "Scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = self.sweep(&mut shutdown).await;
            tracing::debug!(synced = report.synced, failed = report.failed, "Sweep finished");

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = sleep(self.config.sweep_interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        tracing::info!("Scheduler stopped");
    }

    /// Drive exactly one sweep, for the `sync` command and tests.
    pub async fn run_sweep(&self) -> SweepReport {
        let (tx, mut rx) = watch::channel(false);
        let report = self.sweep(&mut rx).await;
        drop(tx);
        report
    }

    async fn sweep(&self, shutdown: &mut watch::Receiver<bool>) -> SweepReport {
        let mut report = SweepReport::default();

        // Snapshot of the feed list; mid-sweep changes wait for the next one.
        let feeds = match self.store.list_feeds() {
            Ok(feeds) => feeds,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list feeds, skipping sweep");
                return report;
            }
        };

        if feeds.is_empty() {
            tracing::debug!("No feeds to sync");
            return report;
        }

        tracing::info!(feeds = feeds.len(), "Starting sweep");

        for feed in feeds {
            if *shutdown.borrow() {
                return report;
            }

            if self.engine.sync_feed(&feed).await {
                report.synced += 1;
            } else {
                report.failed += 1;
            }

            tokio::select! {
                _ = sleep(self.config.feed_spacing) => {}
                _ = shutdown.changed() => return report,
            }
        }

        report
    }
}
