use crate::ports::outbound::DataNeedCatalog;
use parking_lot::RwLock;
use shared_types::{DataNeed, DataNeedId};
use std::collections::HashMap;

/// Data needs held in memory, typically loaded from configuration.
#[derive(Debug, Default)]
pub struct InMemoryDataNeedCatalog {
    needs: RwLock<HashMap<DataNeedId, DataNeed>>,
}

impl InMemoryDataNeedCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_needs(needs: impl IntoIterator<Item = DataNeed>) -> Self {
        let catalog = Self::new();
        for need in needs {
            catalog.insert(need);
        }
        catalog
    }

    /// Data needs are immutable once submitted; a second insert for the same
    /// id is ignored and returns `false`.
    pub fn insert(&self, need: DataNeed) -> bool {
        let mut needs = self.needs.write();
        if needs.contains_key(&need.id) {
            return false;
        }
        needs.insert(need.id.clone(), need);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.needs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataNeedCatalog for InMemoryDataNeedCatalog {
    fn find(&self, id: &DataNeedId) -> Option<DataNeed> {
        self.needs.read().get(id).cloned()
    }
}
