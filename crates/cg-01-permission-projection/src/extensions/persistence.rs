//! # Persistence Extension
//!
//! Keeps the [`PermissionRequestRepository`] in step with the ledger. Each
//! event triggers a full re-projection of its permission from the history,
//! so a missed or reordered bus event never leaves a stale row behind: the
//! next event for the same permission repairs it.

use super::spawn_event_loop;
use crate::domain::errors::HistoryError;
use crate::ports::outbound::{PermissionEventHistory, PermissionRequestRepository};
use shared_bus::Subscription;
use shared_types::{PermissionId, PermissionRequest};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub struct PersistenceExtension {
    history: Arc<dyn PermissionEventHistory>,
    repository: Arc<dyn PermissionRequestRepository>,
}

impl PersistenceExtension {
    #[must_use]
    pub fn new(
        history: Arc<dyn PermissionEventHistory>,
        repository: Arc<dyn PermissionRequestRepository>,
    ) -> Self {
        Self {
            history,
            repository,
        }
    }

    /// Re-project one permission and store the result.
    ///
    /// A permission whose history no longer yields a request (e.g. after
    /// retention cleanup) is removed from the repository.
    pub fn apply(&self, permission_id: &PermissionId) -> Result<Option<PermissionRequest>, HistoryError> {
        let events = self.history.history(permission_id)?;
        match PermissionRequest::replay(&events) {
            Some(request) => {
                debug!(
                    permission_id = %permission_id,
                    status = %request.status,
                    "Permission request projected"
                );
                self.repository.upsert(request.clone());
                Ok(Some(request))
            }
            None => {
                self.repository.remove(permission_id);
                Ok(None)
            }
        }
    }

    /// Rebuild the whole repository from the ledger.
    pub fn resync(&self) -> Result<usize, HistoryError> {
        let ids = self.history.permission_ids()?;
        let mut projected = 0;
        for id in &ids {
            if self.apply(id)?.is_some() {
                projected += 1;
            }
        }
        info!(projected, "Permission read model rebuilt from ledger");
        Ok(projected)
    }

    /// Run against the bus until shutdown.
    pub fn spawn(
        self: Arc<Self>,
        subscription: Subscription,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        spawn_event_loop("persistence", subscription, shutdown, move |event| {
            if let Err(e) = self.apply(&event.permission_id) {
                error!(
                    permission_id = %event.permission_id,
                    error = %e,
                    "Failed to project permission request"
                );
            }
        })
    }
}
