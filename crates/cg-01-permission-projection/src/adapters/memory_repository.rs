use crate::ports::outbound::PermissionRequestRepository;
use parking_lot::RwLock;
use shared_types::{ConnectionId, PermissionId, PermissionRequest, PermissionStatus};
use std::collections::HashMap;

/// Read model held in memory, rebuilt from the ledger at startup.
#[derive(Default)]
pub struct InMemoryPermissionRequestRepository {
    requests: RwLock<HashMap<PermissionId, PermissionRequest>>,
}

impl InMemoryPermissionRequestRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn collect<F>(&self, predicate: F) -> Vec<PermissionRequest>
    where
        F: Fn(&PermissionRequest) -> bool,
    {
        let mut found: Vec<PermissionRequest> = self
            .requests
            .read()
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created);
        found
    }
}

impl PermissionRequestRepository for InMemoryPermissionRequestRepository {
    fn upsert(&self, request: PermissionRequest) {
        self.requests
            .write()
            .insert(request.permission_id.clone(), request);
    }

    fn get(&self, permission_id: &PermissionId) -> Option<PermissionRequest> {
        self.requests.read().get(permission_id).cloned()
    }

    fn find_by_connection(&self, connection_id: &ConnectionId) -> Vec<PermissionRequest> {
        self.collect(|r| &r.connection_id == connection_id)
    }

    fn find_by_status(&self, status: PermissionStatus) -> Vec<PermissionRequest> {
        self.collect(|r| r.status == status)
    }

    fn remove(&self, permission_id: &PermissionId) -> Option<PermissionRequest> {
        self.requests.write().remove(permission_id)
    }

    fn len(&self) -> usize {
        self.requests.read().len()
    }
}
