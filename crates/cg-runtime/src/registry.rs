//! # Adapter Registry
//!
//! Explicit startup registry of region connectors. Everything the runtime
//! knows about connectors comes from what was registered here before
//! [`crate::ConsentGrid::start`]; nothing is discovered at run time.
//!
//! ```toml
//! [[adapters]]
//! id = "sim"
//! kind = "simulation"
//! country_code = "AT"
//! ```

use shared_types::{
    RegionConnector, RegionConnectorId, RegionConnectorMetadata, RegionConnectorRetransmissionService,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Region connector {id} registered twice")]
    DuplicateAdapter { id: RegionConnectorId },

    #[error("Unknown region connector {id}")]
    UnknownAdapter { id: RegionConnectorId },
}

/// A registered connector and its optional retransmission service.
#[derive(Clone)]
pub struct RegisteredAdapter {
    pub connector: Arc<dyn RegionConnector>,
    pub retransmission: Option<Arc<dyn RegionConnectorRetransmissionService>>,
}

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<RegionConnectorId, RegisteredAdapter>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// `RegistryError::DuplicateAdapter` if the connector's id is taken.
    pub fn register(
        &mut self,
        connector: Arc<dyn RegionConnector>,
        retransmission: Option<Arc<dyn RegionConnectorRetransmissionService>>,
    ) -> Result<(), RegistryError> {
        let id = connector.metadata().id;
        if self.adapters.contains_key(&id) {
            return Err(RegistryError::DuplicateAdapter { id });
        }
        info!(
            region_connector = %id,
            retransmission = retransmission.is_some(),
            "Region connector registered"
        );
        self.adapters.insert(
            id,
            RegisteredAdapter {
                connector,
                retransmission,
            },
        );
        Ok(())
    }

    /// # Errors
    ///
    /// `RegistryError::UnknownAdapter` if nothing is registered under `id`.
    pub fn get(&self, id: &RegionConnectorId) -> Result<&RegisteredAdapter, RegistryError> {
        self.adapters
            .get(id)
            .ok_or_else(|| RegistryError::UnknownAdapter { id: id.clone() })
    }

    /// # Errors
    ///
    /// `RegistryError::UnknownAdapter` if nothing is registered under `id`.
    pub fn connector(&self, id: &RegionConnectorId) -> Result<Arc<dyn RegionConnector>, RegistryError> {
        self.get(id).map(|adapter| adapter.connector.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionConnectorId, &RegisteredAdapter)> {
        self.adapters.iter()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<RegionConnectorId> {
        self.adapters.keys().cloned().collect()
    }

    #[must_use]
    pub fn metadata(&self) -> Vec<RegionConnectorMetadata> {
        self.adapters.values().map(|a| a.connector.metadata()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
