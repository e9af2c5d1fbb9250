//! # Outbound Ports (Driven Ports)

use shared_types::{DataNeed, DataNeedId};

/// Lookup of submitted data needs.
pub trait DataNeedCatalog: Send + Sync {
    fn find(&self, id: &DataNeedId) -> Option<DataNeed>;
}
