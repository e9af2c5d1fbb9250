//! # Outbound Ports (Driven Ports)
//!
//! What the projection extensions need from the host: read access to the
//! committed history, and somewhere to keep the read model.

use crate::domain::errors::HistoryError;
use shared_types::{ConnectionId, PermissionEvent, PermissionId, PermissionRequest, PermissionStatus};

/// Read-only view of the event store.
///
/// Production: the ledgers in `cg-02-event-store`.
pub trait PermissionEventHistory: Send + Sync {
    /// Every committed event of one permission, in commit order.
    fn history(&self, permission_id: &PermissionId) -> Result<Vec<PermissionEvent>, HistoryError>;

    /// Every permission with at least one committed event.
    fn permission_ids(&self) -> Result<Vec<PermissionId>, HistoryError>;
}

/// Queryable store of projected permission requests.
pub trait PermissionRequestRepository: Send + Sync {
    /// Insert or replace by `permission_id`.
    fn upsert(&self, request: PermissionRequest);

    fn get(&self, permission_id: &PermissionId) -> Option<PermissionRequest>;

    fn find_by_connection(&self, connection_id: &ConnectionId) -> Vec<PermissionRequest>;

    fn find_by_status(&self, status: PermissionStatus) -> Vec<PermissionRequest>;

    /// Drop a request whose history was removed by retention cleanup.
    fn remove(&self, permission_id: &PermissionId) -> Option<PermissionRequest>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
