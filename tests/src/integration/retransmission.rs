//! # Retransmission
//!
//! Requests routed through the runtime to the owning connector, which
//! validates them against the permission before re-delivering data.

#[cfg(test)]
mod tests {
    use crate::integration::support::{sim_id, start_time, Harness, WAIT};
    use cg_05_document_broker::SubscriptionMode;
    use chrono::Duration;
    use futures::StreamExt;
    use shared_types::{
        DocumentKind, PermissionId, PermissionStatus, RegionConnectorId, RetransmissionOutcome,
        RetransmissionRequest, SchemaVersion,
    };

    fn request(permission_id: &PermissionId, from_day: i64, to_day: i64) -> RetransmissionRequest {
        let today = start_time().date_naive();
        RetransmissionRequest {
            region_connector_id: sim_id(),
            permission_id: permission_id.clone(),
            from: today + Duration::days(from_day),
            to: today + Duration::days(to_day),
        }
    }

    #[tokio::test]
    async fn test_retransmission_redelivers_documents() {
        let h = Harness::start(true);
        let (id, _) = h.create("future-15m").await;
        h.wait_for_status(&id, PermissionStatus::Accepted).await;
        h.clock.advance(Duration::days(5));

        let mut documents = h
            .grid
            .brokers()
            .subscribe(DocumentKind::ValidatedHistoricalData, SchemaVersion::new("1.04"), SubscriptionMode::Live)
            .unwrap();

        let result = h.grid.retransmit(request(&id, 1, 3)).await;
        assert_eq!(result.outcome(), RetransmissionOutcome::Success);
        assert_eq!(result.permission_id(), &id);

        let envelope = tokio::time::timeout(WAIT, documents.next())
            .await
            .expect("retransmitted document arrives")
            .unwrap();
        assert_eq!(envelope.header.permission_id, id);
        assert_eq!(envelope.payload["retransmission"]["from"], "2025-03-02");
        assert_eq!(envelope.payload["retransmission"]["to"], "2025-03-04");
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_connector_not_contacted() {
        let h = Harness::start(true);
        let (id, _) = h.create("future-15m").await;

        let mut unrouted = request(&id, 1, 3);
        unrouted.region_connector_id = RegionConnectorId::new("nowhere");
        let result = h.grid.retransmit(unrouted).await;

        assert_eq!(result.outcome(), RetransmissionOutcome::RetransmissionServiceNotFound);
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_pending_permission_is_not_active() {
        let h = Harness::start(false);
        let (id, status) = h.create("future-15m").await;
        assert_eq!(status, PermissionStatus::SentToAdministrator);
        h.clock.advance(Duration::days(5));

        let result = h.grid.retransmit(request(&id, 1, 3)).await;
        assert_eq!(result.outcome(), RetransmissionOutcome::NoActivePermission);
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_range_reaching_today_not_supported() {
        let h = Harness::start(true);
        let (id, _) = h.create("future-15m").await;
        h.wait_for_status(&id, PermissionStatus::Accepted).await;
        h.clock.advance(Duration::days(5));

        let result = h.grid.retransmit(request(&id, 1, 5)).await;
        assert_eq!(result.outcome(), RetransmissionOutcome::NotSupported);
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_range_outside_validity() {
        let h = Harness::start(true);
        let (id, _) = h.create("future-15m").await;
        h.wait_for_status(&id, PermissionStatus::Accepted).await;
        h.clock.advance(Duration::days(5));

        let result = h.grid.retransmit(request(&id, -3, 2)).await;
        assert_eq!(result.outcome(), RetransmissionOutcome::NoPermissionForTimeFrame);
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_permission() {
        let h = Harness::start(true);
        let result = h.grid.retransmit(request(&PermissionId::new("ghost"), 1, 2)).await;
        assert_eq!(result.outcome(), RetransmissionOutcome::PermissionRequestNotFound);
        h.grid.shutdown().await;
    }
}
