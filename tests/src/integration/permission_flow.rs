//! # Permission Flow
//!
//! create → Created → Validated → SentToAdministrator → Accepted → Revoked,
//! observed through the read model and the connection status stream.

#[cfg(test)]
mod tests {
    use crate::integration::support::{sim_id, Harness, WAIT};
    use cg_01_permission_projection::PermissionRequestRepository;
    use cg_02_event_store::{EventLedger, StoreError};
    use cg_runtime::OrchestratorError;
    use futures::StreamExt;
    use shared_types::{AdapterStatusUpdate, Clock, ConnectionId, DataNeedId, PermissionStatus};

    #[tokio::test]
    async fn test_accepted_permission_reaches_read_model() {
        let h = Harness::start(true);
        let (id, status) = h.create("future-15m").await;
        assert!(matches!(
            status,
            PermissionStatus::SentToAdministrator | PermissionStatus::Accepted
        ));

        let request = h.wait_for_status(&id, PermissionStatus::Accepted).await;
        assert_eq!(request.connection_id, ConnectionId::new("conn-1"));
        assert_eq!(request.data_source.country_code, "AT");
        let validity = request.validity.expect("validated permissions carry validity");
        assert_eq!(validity.start(), h.clock.today());
        assert!(h.sim.was_sent(&id));

        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_stream_follows_the_permission() {
        let h = Harness::start(true);
        let mut statuses = h
            .grid
            .notifications()
            .connection_status_stream(ConnectionId::new("conn-1"));

        let (id, _) = h.create("future-15m").await;

        let mut seen = Vec::new();
        tokio::time::timeout(WAIT, async {
            while let Some(message) = statuses.next().await {
                assert_eq!(message.permission_id, id);
                seen.push(message.status);
                if message.status == PermissionStatus::Accepted {
                    break;
                }
            }
        })
        .await
        .expect("Accepted message arrives");

        assert_eq!(seen.first(), Some(&PermissionStatus::Created));
        assert_eq!(seen.last(), Some(&PermissionStatus::Accepted));
        assert!(seen.contains(&PermissionStatus::Validated));
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_revoke_accepted_permission() {
        let h = Harness::start(true);
        let (id, _) = h.create("ap").await;
        h.wait_for_status(&id, PermissionStatus::Accepted).await;

        let status = h.grid.orchestrator().revoke(&id).await.unwrap();
        assert_eq!(status, PermissionStatus::Revoked);
        h.wait_for_status(&id, PermissionStatus::Revoked).await;
        assert!(h.sim.was_revoked(&id));

        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_data_need_is_malformed() {
        let h = Harness::start(true);
        let (id, status) = h.create("does-not-exist").await;

        assert_eq!(status, PermissionStatus::Malformed);
        h.wait_for_status(&id, PermissionStatus::Malformed).await;
        assert!(!h.sim.was_sent(&id));
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_rejection_is_terminal() {
        let h = Harness::start(false);
        let (id, status) = h.create("future-15m").await;
        assert_eq!(status, PermissionStatus::SentToAdministrator);

        h.sim.report_status(
            AdapterStatusUpdate::new(id.clone(), PermissionStatus::Rejected).with_reason("Customer declined"),
        );
        let request = h.wait_for_status(&id, PermissionStatus::Rejected).await;
        assert_eq!(request.reason.as_deref(), Some("Customer declined"));

        let late = h
            .grid
            .orchestrator()
            .apply_status_update(
                &sim_id(),
                AdapterStatusUpdate::new(id.clone(), PermissionStatus::Accepted),
            )
            .await;
        assert!(matches!(
            late,
            Err(OrchestratorError::Store(StoreError::Transition { .. }))
        ));
        assert_eq!(
            h.grid.repository().get(&id).unwrap().status,
            PermissionStatus::Rejected
        );
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_connector_bookkeeping_is_not_announced() {
        let h = Harness::start(false);
        let (id, _) = h.create("future-15m").await;
        h.wait_for_status(&id, PermissionStatus::SentToAdministrator).await;
        let mut statuses = h
            .grid
            .notifications()
            .connection_status_stream(ConnectionId::new("conn-1"));

        h.sim.report_status(
            AdapterStatusUpdate::new(id.clone(), PermissionStatus::SentToAdministrator)
                .with_data(serde_json::json!({ "cm_request_id": "abc" })),
        );
        h.sim.report_status(
            AdapterStatusUpdate::new(id.clone(), PermissionStatus::Rejected)
                .with_reason("customer declined")
                .with_data(serde_json::json!({ "mda_ref": "X1" })),
        );

        let rejected = tokio::time::timeout(WAIT, async {
            while let Some(message) = statuses.next().await {
                let bookkeeping = message
                    .additional_information
                    .as_ref()
                    .is_some_and(|info| info.get("cm_request_id").is_some());
                assert!(!bookkeeping, "internal update reached the status stream");
                if message.status == PermissionStatus::Rejected {
                    return message;
                }
            }
            panic!("status stream ended");
        })
        .await
        .expect("Rejected message arrives");
        assert_eq!(rejected.message.as_deref(), Some("customer declined"));
        assert_eq!(rejected.additional_information.unwrap()["mda_ref"], "X1");

        let request = h.wait_for_status(&id, PermissionStatus::Rejected).await;
        assert_eq!(request.reason.as_deref(), Some("customer declined"));
        let history = h.grid.outbox().ledger().history(&id).unwrap();
        assert!(history.iter().any(|event| !event.is_external()));
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_matcher_lists_supporting_connectors() {
        let h = Harness::start(true);
        let adapters = h.grid.supporting_adapters(&DataNeedId::new("ap")).unwrap();
        assert_eq!(adapters, vec![sim_id()]);
        h.grid.shutdown().await;
    }
}
