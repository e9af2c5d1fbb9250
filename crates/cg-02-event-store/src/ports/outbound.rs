//! # Outbound Ports (Driven Ports)
//!
//! The durable history behind the outbox. Implementations must make an
//! appended event durable before `append` returns.

use crate::domain::append::AppendCondition;
use crate::domain::errors::{LedgerError, StoreError};
use chrono::{DateTime, Utc};
use shared_types::{EventRecordId, PermissionEvent, PermissionId, PermissionRequest, PermissionStatus};

/// Removal of old records for retention jobs.
pub trait RetentionCleanup: Send + Sync {
    /// Up to `limit` records created before `before`, oldest first.
    fn find_oldest_before(
        &self,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<EventRecordId>, LedgerError>;

    /// Delete the given records. Returns how many existed.
    fn delete_by_ids(&self, ids: &[EventRecordId]) -> Result<usize, LedgerError>;
}

/// Append-only permission event ledger.
///
/// Appends for the same permission are serialized and checked against the
/// projected status under one lock. Appends for different permissions do
/// not contend.
pub trait EventLedger: RetentionCleanup {
    /// Append one event and assign its sequence.
    ///
    /// # Errors
    ///
    /// - `StoreError::UnknownPermission` if the first event is not a creation
    /// - `StoreError::Transition` if the permission is already terminal
    /// - `StoreError::StatusChanged` if `condition` does not hold
    /// - `StoreError::Ledger` if the event could not be persisted
    fn append(
        &self,
        event: PermissionEvent,
        condition: AppendCondition,
    ) -> Result<PermissionEvent, StoreError>;

    fn history(&self, permission_id: &PermissionId) -> Result<Vec<PermissionEvent>, LedgerError>;

    fn permission_ids(&self) -> Result<Vec<PermissionId>, LedgerError>;

    /// Permissions in one of `statuses` with no event since `older_than`.
    fn find_stale(
        &self,
        older_than: DateTime<Utc>,
        statuses: &[PermissionStatus],
    ) -> Result<Vec<PermissionRequest>, LedgerError>;
}
