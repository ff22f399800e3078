//! Periodic execution of the inventory syncers

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::Syncer;
use crate::error::{Error, Result};
use crate::shutdown::Shutdown;

/// Runs every syncer in order, once at start and then on a fixed interval
pub struct SyncScheduler {
    syncers: Vec<Box<dyn Syncer>>,
    interval: Duration,
    pass_timeout: Duration,
}

impl SyncScheduler {
    pub fn new(syncers: Vec<Box<dyn Syncer>>, interval: Duration, pass_timeout: Duration) -> Self {
        Self {
            syncers,
            interval,
            pass_timeout,
        }
    }

    pub async fn run(&self, shutdown: Shutdown) {
        info!(
            "Starting sync scheduler with {} syncers (interval {:?})",
            self.syncers.len(),
            self.interval
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    if shutdown.is_triggered() {
                        break;
                    }
                    self.run_pass().await;
                }
            }
        }
        info!("Sync scheduler stopped");
    }

    /// One sequential pass over all syncers. A failing syncer is logged and the pass
    /// moves on. Returns the number of syncers that failed.
    pub async fn run_pass(&self) -> usize {
        let mut failed = 0;
        for syncer in &self.syncers {
            match self.run_one(syncer.as_ref()).await {
                Ok(report) => info!(
                    "{} sync: {} created, {} deleted, {} unchanged, {} retained, {} skipped",
                    syncer.name(),
                    report.created,
                    report.deleted,
                    report.unchanged,
                    report.retained,
                    report.skipped
                ),
                Err(e) => {
                    warn!("{} sync failed: {}", syncer.name(), e);
                    failed += 1;
                }
            }
        }
        failed
    }

    async fn run_one(&self, syncer: &dyn Syncer) -> Result<super::SyncReport> {
        tokio::time::timeout(self.pass_timeout, syncer.sync())
            .await
            .map_err(|_| {
                Error::Timeout(format!("{} sync after {:?}", syncer.name(), self.pass_timeout))
            })?
    }
}
