//! # Outbox
//!
//! The single write path for permission events: append durably, then publish
//! the committed event to the bus. A failed append publishes nothing.

use crate::adapters::LedgerHistory;
use crate::domain::append::AppendCondition;
use crate::domain::errors::StoreError;
use crate::ports::outbound::EventLedger;
use cg_01_permission_projection::PermissionEventHistory;
use cg_telemetry::{COMMITS_REJECTED, EVENTS_COMMITTED};
use shared_bus::EventPublisher;
use shared_types::{PermissionEvent, PermissionStatus};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Outbox {
    ledger: Arc<dyn EventLedger>,
    publisher: Arc<dyn EventPublisher>,
}

impl Outbox {
    #[must_use]
    pub fn new(ledger: Arc<dyn EventLedger>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { ledger, publisher }
    }

    /// Commit `event` and publish it.
    ///
    /// Returns the event with its assigned sequence.
    pub async fn commit(&self, event: PermissionEvent) -> Result<PermissionEvent, StoreError> {
        self.commit_with(event, AppendCondition::Unconditional).await
    }

    /// Commit `event` only if the permission's projected status is still
    /// `expected` at append time.
    pub async fn commit_if_status(
        &self,
        event: PermissionEvent,
        expected: PermissionStatus,
    ) -> Result<PermissionEvent, StoreError> {
        self.commit_with(event, AppendCondition::StatusIs(expected)).await
    }

    async fn commit_with(
        &self,
        event: PermissionEvent,
        condition: AppendCondition,
    ) -> Result<PermissionEvent, StoreError> {
        let committed = match self.ledger.append(event, condition) {
            Ok(committed) => committed,
            Err(e) => {
                COMMITS_REJECTED.with_label_values(&[e.metric_reason()]).inc();
                warn!(error = %e, "Permission event rejected");
                return Err(e);
            }
        };

        EVENTS_COMMITTED
            .with_label_values(&[committed.status.as_str()])
            .inc();
        let receivers = self.publisher.publish(committed.clone()).await;
        debug!(
            permission_id = %committed.permission_id,
            status = %committed.status,
            sequence = committed.sequence,
            receivers,
            "Permission event committed"
        );
        Ok(committed)
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn EventLedger> {
        &self.ledger
    }

    /// The ledger as seen by the projection extensions.
    #[must_use]
    pub fn history(&self) -> Arc<dyn PermissionEventHistory> {
        Arc::new(LedgerHistory(self.ledger.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryEventLedger;
    use crate::test_support::created;
    use chrono::{Duration, Utc};
    use shared_bus::{EventFilter, InMemoryEventBus};
    use shared_types::PermissionId;

    fn outbox() -> (Outbox, Arc<InMemoryEventBus>) {
        let bus = Arc::new(InMemoryEventBus::new());
        let outbox = Outbox::new(Arc::new(InMemoryEventLedger::new()), bus.clone());
        (outbox, bus)
    }

    #[tokio::test]
    async fn test_commit_publishes_committed_event() {
        let (outbox, bus) = outbox();
        let mut sub = bus.subscribe(EventFilter::all());

        let committed = outbox.commit(created("p1", Utc::now())).await.unwrap();
        let received = sub.recv().await.unwrap();
        assert_eq!(received.sequence, committed.sequence);
        assert_eq!(received.permission_id.as_str(), "p1");
    }

    #[tokio::test]
    async fn test_rejected_commit_publishes_nothing() {
        let (outbox, bus) = outbox();
        let mut sub = bus.subscribe(EventFilter::all());

        let result = outbox
            .commit(PermissionEvent::new(PermissionId::new("ghost"), PermissionStatus::Accepted, Utc::now()))
            .await;
        assert!(matches!(result, Err(StoreError::UnknownPermission(_))));
        assert!(sub.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_terminal_is_absorbing() {
        let (outbox, _bus) = outbox();
        let t0 = Utc::now();
        outbox.commit(created("p1", t0)).await.unwrap();
        outbox
            .commit(PermissionEvent::new(PermissionId::new("p1"), PermissionStatus::Revoked, t0 + Duration::seconds(1)))
            .await
            .unwrap();

        let result = outbox
            .commit(PermissionEvent::new(PermissionId::new("p1"), PermissionStatus::Accepted, t0 + Duration::seconds(2)))
            .await;
        assert!(matches!(result, Err(StoreError::Transition { .. })));

        let history = outbox.history().history(&PermissionId::new("p1")).unwrap();
        assert_eq!(
            cg_01_permission_projection::project(&history),
            Some(PermissionStatus::Revoked)
        );
    }

    #[tokio::test]
    async fn test_commit_if_status_detects_change() {
        let (outbox, _bus) = outbox();
        let t0 = Utc::now();
        outbox.commit(created("p1", t0)).await.unwrap();
        outbox
            .commit(PermissionEvent::new(PermissionId::new("p1"), PermissionStatus::Validated, t0 + Duration::seconds(1)))
            .await
            .unwrap();

        let result = outbox
            .commit_if_status(
                PermissionEvent::new(PermissionId::new("p1"), PermissionStatus::TimedOut, t0 + Duration::seconds(2)),
                PermissionStatus::Created,
            )
            .await;
        assert!(matches!(
            result,
            Err(StoreError::StatusChanged {
                actual: Some(PermissionStatus::Validated),
                ..
            })
        ));
    }
}
