//! # Stale Request Reclaimer
//!
//! Times out permissions whose latest event is older than the threshold and
//! whose status is still sweepable. Each reclamation is a conditional commit
//! ("only if still in status S"), so overlapping sweeps and concurrent
//! status changes never produce a second `TimedOut` event.

use crate::config::ReclaimerConfig;
use cg_02_event_store::{LedgerError, Outbox, StoreError};
use cg_telemetry::{time_histogram, PERMISSIONS_RECLAIMED, SWEEP_DURATION};
use shared_types::{Clock, PermissionEvent, PermissionStatus};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub candidates: usize,
    pub reclaimed: usize,
    /// Changed status between the scan and the commit.
    pub skipped: usize,
    pub failed: usize,
}

pub struct StaleRequestReclaimer {
    outbox: Arc<Outbox>,
    clock: Arc<dyn Clock>,
    config: ReclaimerConfig,
}

impl StaleRequestReclaimer {
    #[must_use]
    pub fn new(outbox: Arc<Outbox>, clock: Arc<dyn Clock>, config: ReclaimerConfig) -> Self {
        Self {
            outbox,
            clock,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ReclaimerConfig {
        &self.config
    }

    /// Run one sweep at the clock's current time.
    ///
    /// # Errors
    ///
    /// Only the stale scan itself can fail. Individual commit failures are
    /// logged and counted in the report.
    pub async fn sweep(&self) -> Result<SweepReport, LedgerError> {
        let _timer = time_histogram!(SWEEP_DURATION);
        let now = self.clock.now();
        let older_than = now - self.config.stale_after();
        let sweepable = self.config.effective_sweepable();

        let stale = self.outbox.ledger().find_stale(older_than, &sweepable)?;
        let mut report = SweepReport {
            candidates: stale.len(),
            ..SweepReport::default()
        };

        for request in stale {
            let event = PermissionEvent::new(request.permission_id.clone(), PermissionStatus::TimedOut, now)
                .with_reason(format!(
                    "No status change for {} hours while {}",
                    self.config.stale_after_hours, request.status
                ));

            match self.outbox.commit_if_status(event, request.status).await {
                Ok(_) => {
                    report.reclaimed += 1;
                    PERMISSIONS_RECLAIMED.inc();
                    info!(
                        permission_id = %request.permission_id,
                        previous_status = %request.status,
                        "Stale permission timed out"
                    );
                }
                Err(StoreError::StatusChanged { .. } | StoreError::Transition { .. }) => {
                    report.skipped += 1;
                    debug!(
                        permission_id = %request.permission_id,
                        "Permission changed since scan, not reclaimed"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        permission_id = %request.permission_id,
                        error = %e,
                        "Failed to reclaim stale permission"
                    );
                }
            }
        }

        debug!(
            candidates = report.candidates,
            reclaimed = report.reclaimed,
            skipped = report.skipped,
            failed = report.failed,
            "Sweep finished"
        );
        Ok(report)
    }

    /// Sweep every configured interval until `shutdown` flips.
    ///
    /// Ticks missed while a sweep runs are skipped, not queued.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(
                interval_secs = self.config.interval().as_secs(),
                stale_after_hours = self.config.stale_after_hours,
                "Stale request reclaimer started"
            );

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep().await {
                            error!(error = %e, "Stale permission scan failed");
                        }
                    }
                }
            }
            info!("Stale request reclaimer stopped");
        })
    }
}
