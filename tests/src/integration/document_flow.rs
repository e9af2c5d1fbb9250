//! # Document Flow
//!
//! Connector readings → document pipeline → broker → consumers, including
//! replay subscribers and stream completion when the connector finishes.
//! Permission status changes travel the same way as permission market
//! documents.

#[cfg(test)]
mod tests {
    use crate::integration::support::{Harness, WAIT};
    use cg_05_document_broker::{DocumentStream, SubscriptionMode};
    use futures::StreamExt;
    use shared_types::{
        AdapterStatusUpdate, DocumentKind, MarketDocumentEnvelope, PermissionId, PermissionStatus,
        SchemaVersion,
    };
    use std::sync::Arc;

    fn subscribe(h: &Harness, mode: SubscriptionMode) -> DocumentStream {
        h.grid
            .brokers()
            .subscribe(DocumentKind::ValidatedHistoricalData, SchemaVersion::new("1.04"), mode)
            .unwrap()
    }

    async fn next(documents: &mut DocumentStream) -> Option<Arc<MarketDocumentEnvelope>> {
        tokio::time::timeout(WAIT, documents.next())
            .await
            .expect("document stream stalled")
    }

    async fn accepted(h: &Harness) -> PermissionId {
        let (id, _) = h.create("future-15m").await;
        h.wait_for_status(&id, PermissionStatus::Accepted).await;
        id
    }

    #[tokio::test]
    async fn test_reading_becomes_envelope() {
        let h = Harness::start(true);
        let id = accepted(&h).await;
        let mut documents = subscribe(&h, SubscriptionMode::Live);

        h.sim.emit_reading(h.reading(&id, serde_json::json!({ "kwh": [1.0, 2.5] })));

        let envelope = next(&mut documents).await.unwrap();
        assert_eq!(envelope.header.permission_id, id);
        assert_eq!(envelope.header.country, "AT");
        assert_eq!(envelope.header.version, SchemaVersion::new("1.04"));
        assert_eq!(envelope.payload["kwh"][1], 2.5);
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_bad_readings_are_skipped() {
        let h = Harness::start(true);
        let id = accepted(&h).await;
        let mut documents = subscribe(&h, SubscriptionMode::Live);

        h.sim.emit_reading(h.reading(&PermissionId::new("unknown"), serde_json::json!({ "n": 0 })));
        h.sim.emit_reading(h.reading(&id, serde_json::json!("not an object")));
        h.sim.emit_reading(h.reading(&id, serde_json::json!({ "n": 1 })));

        let envelope = next(&mut documents).await.unwrap();
        assert_eq!(envelope.payload["n"], 1);
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_replay_subscriber_then_completion() {
        let h = Harness::start(true);
        let id = accepted(&h).await;
        let mut live = subscribe(&h, SubscriptionMode::Live);

        h.sim.emit_reading(h.reading(&id, serde_json::json!({ "doc": 1 })));
        assert_eq!(next(&mut live).await.unwrap().payload["doc"], 1);

        // Joins after doc1 was published
        let mut replay = subscribe(&h, SubscriptionMode::Replay);
        h.sim.emit_reading(h.reading(&id, serde_json::json!({ "doc": 2 })));

        assert_eq!(next(&mut replay).await.unwrap().payload["doc"], 1);
        assert_eq!(next(&mut replay).await.unwrap().payload["doc"], 2);

        // The simulation connector is the only producer
        h.sim.finish_readings();
        assert!(next(&mut replay).await.is_none());
        assert_eq!(next(&mut live).await.unwrap().payload["doc"], 2);
        assert!(next(&mut live).await.is_none());

        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_permission_lifecycle_as_documents() {
        let h = Harness::start(false);
        let (id, _) = h.create("future-15m").await;
        h.sim.report_status(
            AdapterStatusUpdate::new(id.clone(), PermissionStatus::Rejected).with_reason("customer declined"),
        );
        h.wait_for_status(&id, PermissionStatus::Rejected).await;

        let mut documents = h
            .grid
            .brokers()
            .subscribe(
                DocumentKind::PermissionMarketDocument,
                SchemaVersion::new("1.04"),
                SubscriptionMode::Replay,
            )
            .unwrap();
        let mut statuses = Vec::new();
        let rejected = loop {
            let document = next(&mut documents).await.expect("stream open");
            assert_eq!(document.header.permission_id, id);
            let status = document.payload["permission"]["status"].clone();
            statuses.push(status.clone());
            if status == "REJECTED" {
                break document;
            }
        };

        assert_eq!(statuses.first().unwrap(), "CREATED");
        assert!(statuses.iter().any(|status| status == "SENT_TO_ADMINISTRATOR"));
        assert_eq!(rejected.payload["permission"]["reason"], "customer declined");
        assert_eq!(rejected.payload["mRID"], id.as_str());
        h.grid.shutdown().await;
    }
}
