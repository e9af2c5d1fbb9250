use crate::domain::append::AppendCondition;
use crate::domain::errors::{LedgerError, StoreError};
use crate::domain::streams::PermissionStreams;
use crate::ports::outbound::{EventLedger, RetentionCleanup};
use chrono::{DateTime, Utc};
use shared_types::{EventRecordId, PermissionEvent, PermissionId, PermissionRequest, PermissionStatus};
use std::collections::HashSet;

/// Ledger kept in memory only. Lost on restart.
#[derive(Default)]
pub struct InMemoryEventLedger {
    streams: PermissionStreams,
}

impl InMemoryEventLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RetentionCleanup for InMemoryEventLedger {
    fn find_oldest_before(
        &self,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<EventRecordId>, LedgerError> {
        Ok(self.streams.oldest_before(before, limit))
    }

    fn delete_by_ids(&self, ids: &[EventRecordId]) -> Result<usize, LedgerError> {
        let ids: HashSet<u64> = ids.iter().map(|id| id.0).collect();
        Ok(self.streams.delete(&ids))
    }
}

impl EventLedger for InMemoryEventLedger {
    fn append(
        &self,
        event: PermissionEvent,
        condition: AppendCondition,
    ) -> Result<PermissionEvent, StoreError> {
        self.streams.append(event, condition, |event| {
            event.sequence = self.streams.next_sequence();
            Ok(())
        })
    }

    fn history(&self, permission_id: &PermissionId) -> Result<Vec<PermissionEvent>, LedgerError> {
        Ok(self.streams.history(permission_id))
    }

    fn permission_ids(&self) -> Result<Vec<PermissionId>, LedgerError> {
        Ok(self.streams.permission_ids())
    }

    fn find_stale(
        &self,
        older_than: DateTime<Utc>,
        statuses: &[PermissionStatus],
    ) -> Result<Vec<PermissionRequest>, LedgerError> {
        Ok(self.streams.find_stale(older_than, statuses))
    }
}
