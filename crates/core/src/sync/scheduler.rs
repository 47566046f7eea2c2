//! Runs several coordinators side by side.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::coordinator::SyncCoordinator;
use super::types::{FeedFilter, SyncReport};
use crate::ledger::{LedgerError, SourceModule};

/// Concurrent driver for one coordinator per module.
pub struct SyncScheduler {
    coordinators: Vec<SyncCoordinator>,
}

impl SyncScheduler {
    /// Creates a scheduler.
    #[must_use]
    pub const fn new(coordinators: Vec<SyncCoordinator>) -> Self {
        Self { coordinators }
    }

    /// Modules being scheduled.
    #[must_use]
    pub fn modules(&self) -> Vec<SourceModule> {
        self.coordinators.iter().map(SyncCoordinator::module).collect()
    }

    /// Runs every coordinator once, concurrently.
    pub async fn run_once(
        &self,
        filter: &FeedFilter,
    ) -> Vec<(SourceModule, Result<SyncReport, LedgerError>)> {
        let runs = self
            .coordinators
            .iter()
            .map(|c| async move { (c.module(), c.run(filter).await) });
        join_all(runs).await
    }

    /// Runs every `period` over the trailing `lookback_days` until `shutdown` resolves.
    ///
    /// A round in progress is allowed to finish.
    pub async fn run_every<F>(&self, period: Duration, lookback_days: i64, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("sync scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let filter = FeedFilter::lookback(Utc::now().date_naive(), lookback_days);
                    for (module, outcome) in self.run_once(&filter).await {
                        match outcome {
                            Ok(report) => info!(
                                module = %module,
                                status = %report.status,
                                succeeded = report.records_succeeded,
                                failed = report.records_failed,
                                "sync round complete"
                            ),
                            Err(err) => error!(module = %module, error = %err, "sync round failed"),
                        }
                    }
                }
            }
        }
    }
}
