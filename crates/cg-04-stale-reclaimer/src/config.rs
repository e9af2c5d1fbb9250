use serde::{Deserialize, Serialize};
use shared_types::PermissionStatus;
use std::time::Duration;

const MAX_STALE_HOURS: u64 = 24 * 365 * 100;

/// Reclaimer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReclaimerConfig {
    /// Seconds between sweeps.
    pub interval_secs: u64,
    /// A permission is stale once its latest event is this old.
    pub stale_after_hours: u64,
    /// Statuses a permission may be reclaimed from. Terminal entries are
    /// ignored.
    pub sweepable: Vec<PermissionStatus>,
}

impl Default for ReclaimerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            stale_after_hours: 24,
            sweepable: vec![
                PermissionStatus::Created,
                PermissionStatus::Validated,
                PermissionStatus::SentToAdministrator,
                PermissionStatus::PendingAcknowledgement,
            ],
        }
    }
}

impl ReclaimerConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    #[must_use]
    pub fn stale_after(&self) -> chrono::Duration {
        // Capped at a century; chrono panics on overflow
        let hours = self.stale_after_hours.min(MAX_STALE_HOURS);
        chrono::Duration::hours(hours as i64)
    }

    /// Sweepable statuses without terminal ones.
    #[must_use]
    pub fn effective_sweepable(&self) -> Vec<PermissionStatus> {
        self.sweepable
            .iter()
            .copied()
            .filter(|s| !s.is_terminal())
            .collect()
    }
}
