//! # Recovery
//!
//! A file-backed ledger outlives the runtime: a restarted runtime rebuilds
//! its read model from the ledger and keeps appending after the last event.

#[cfg(test)]
mod tests {
    use crate::integration::support::{self, Harness};
    use cg_01_permission_projection::PermissionRequestRepository;
    use cg_02_event_store::{EventLedger, LedgerError};
    use cg_runtime::{AdapterRegistry, ConsentGrid, LedgerBackend, RuntimeConfig, RuntimeError};
    use shared_types::{ManualClock, PermissionId, PermissionStatus};
    use std::path::Path;
    use std::sync::Arc;

    fn file_config(dir: &Path) -> RuntimeConfig {
        let mut config = support::config();
        config.event_store.backend = LedgerBackend::File;
        config.event_store.path = dir.join("events.jsonl");
        config
    }

    fn last_sequence(h: &Harness, id: &PermissionId) -> u64 {
        h.grid
            .outbox()
            .ledger()
            .history(id)
            .unwrap()
            .last()
            .map(|event| event.sequence)
            .unwrap()
    }

    #[tokio::test]
    async fn test_restart_rebuilds_read_model() {
        let dir = tempfile::tempdir().unwrap();

        let (sent, malformed, sequence) = {
            let h = Harness::start_with(file_config(dir.path()), false);
            let (sent, _) = h.create("future-15m").await;
            let (malformed, _) = h.create("does-not-exist").await;
            h.wait_for_status(&malformed, PermissionStatus::Malformed).await;
            let sequence = last_sequence(&h, &malformed);
            h.grid.shutdown().await;
            (sent, malformed, sequence)
        };

        let h = Harness::start_with(file_config(dir.path()), false);
        let restored = h.grid.repository();
        assert_eq!(
            restored.get(&sent).unwrap().status,
            PermissionStatus::SentToAdministrator
        );
        assert_eq!(restored.get(&malformed).unwrap().status, PermissionStatus::Malformed);

        let (fresh, _) = h.create("ap").await;
        assert!(last_sequence(&h, &fresh) > sequence);
        h.grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_second_runtime_on_same_ledger_refused() {
        let dir = tempfile::tempdir().unwrap();
        let h = Harness::start_with(file_config(dir.path()), false);

        let second = ConsentGrid::build_with(
            file_config(dir.path()),
            Arc::new(ManualClock::new(support::start_time())),
            |_| Ok(AdapterRegistry::new()),
        );
        assert!(matches!(
            second,
            Err(RuntimeError::Ledger(LedgerError::Locked { .. }))
        ));
        h.grid.shutdown().await;
    }
}
