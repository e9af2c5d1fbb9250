use crate::ports::outbound::EventLedger;
use cg_01_permission_projection::{HistoryError, PermissionEventHistory};
use shared_types::{PermissionEvent, PermissionId};
use std::sync::Arc;

/// Read-only view of a ledger for the projection extensions.
#[derive(Clone)]
pub struct LedgerHistory(pub Arc<dyn EventLedger>);

impl PermissionEventHistory for LedgerHistory {
    fn history(&self, permission_id: &PermissionId) -> Result<Vec<PermissionEvent>, HistoryError> {
        self.0
            .history(permission_id)
            .map_err(|e| HistoryError::Unavailable(e.to_string()))
    }

    fn permission_ids(&self) -> Result<Vec<PermissionId>, HistoryError> {
        self.0
            .permission_ids()
            .map_err(|e| HistoryError::Unavailable(e.to_string()))
    }
}
