//! # Reclamation
//!
//! Permissions left waiting on the administrator time out after the stale
//! threshold, exactly once, however many sweeps overlap.

#[cfg(test)]
mod tests {
    use crate::integration::support::{sim_id, Harness};
    use cg_02_event_store::EventLedger;
    use chrono::Duration;
    use shared_types::{AdapterStatusUpdate, PermissionId, PermissionStatus};

    fn timeouts(h: &Harness, id: &PermissionId) -> usize {
        h.grid
            .outbox()
            .ledger()
            .history(id)
            .unwrap()
            .iter()
            .filter(|event| event.status == PermissionStatus::TimedOut)
            .count()
    }

    #[tokio::test]
    async fn test_overlapping_sweeps_time_out_once() {
        let h = Harness::start(false);
        let (id, status) = h.create("future-15m").await;
        assert_eq!(status, PermissionStatus::SentToAdministrator);

        h.clock.advance(Duration::hours(25));
        let reclaimer = h.grid.reclaimer();
        let (first, second) = tokio::join!(reclaimer.sweep(), reclaimer.sweep());
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(first.reclaimed + second.reclaimed, 1);
        assert_eq!(timeouts(&h, &id), 1);
        let request = h.wait_for_status(&id, PermissionStatus::TimedOut).await;
        assert!(request.reason.unwrap().contains("24 hours"));

        // Already terminal, nothing left to reclaim
        let again = reclaimer.sweep().await.unwrap();
        assert_eq!(again.candidates, 0);
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_recent_and_accepted_permissions_survive() {
        let h = Harness::start(false);
        let (stale, _) = h.create("future-15m").await;
        let (accepted, _) = h.create("ap").await;
        h.grid
            .orchestrator()
            .apply_status_update(
                &sim_id(),
                AdapterStatusUpdate::new(accepted.clone(), PermissionStatus::Accepted),
            )
            .await
            .unwrap();

        h.clock.advance(Duration::hours(25));
        let (recent, _) = h.create("future-15m").await;

        let report = h.grid.reclaimer().sweep().await.unwrap();
        assert_eq!(report.reclaimed, 1);
        assert_eq!(timeouts(&h, &stale), 1);
        assert_eq!(timeouts(&h, &accepted), 0);
        assert_eq!(timeouts(&h, &recent), 0);

        h.wait_for_status(&stale, PermissionStatus::TimedOut).await;
        h.wait_for_status(&recent, PermissionStatus::SentToAdministrator).await;
        h.grid.shutdown().await;
    }
}
