//! # Permission Orchestrator
//!
//! Drives a permission request through its first statuses:
//!
//! ```text
//! create ─→ Created ─→ Validated ──→ SentToAdministrator
//!                   ├→ Malformed     └→ UnableToSend
//!                   └→ Unfulfillable
//! ```
//!
//! After that the administrator takes over through the connector's status
//! updates, which land here via [`PermissionOrchestrator::apply_status_update`].
//! Every transition is committed through the outbox; nothing here writes to
//! the read model directly.

use crate::registry::{AdapterRegistry, RegistryError};
use cg_02_event_store::{Outbox, StoreError};
use cg_03_data_needs::{DataNeedCalculation, DataNeedCalculationService, DataNeedCatalog};
use cg_telemetry::PERMISSIONS_CREATED;
use shared_types::{
    AdapterError, AdapterStatusUpdate, Clock, ConnectionId, DataNeedId, EventPayload,
    PermissionDetails, PermissionEvent, PermissionId, PermissionRequest, PermissionStatus,
    RegionConnector, RegionConnectorId, ValidationError,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Unknown permission: {0}")]
    UnknownPermission(PermissionId),

    #[error("Permission {permission_id} belongs to {owner}, not {region_connector_id}")]
    ForeignPermission {
        permission_id: PermissionId,
        owner: RegionConnectorId,
        region_connector_id: RegionConnectorId,
    },

    #[error("Region connector refused: {0}")]
    Adapter(#[from] AdapterError),
}

/// Input of [`PermissionOrchestrator::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePermission {
    pub connection_id: ConnectionId,
    pub data_need_id: DataNeedId,
    pub region_connector_id: RegionConnectorId,
}

/// Where a freshly created permission ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPermission {
    pub permission_id: PermissionId,
    pub status: PermissionStatus,
}

pub struct PermissionOrchestrator {
    outbox: Arc<Outbox>,
    adapters: Arc<AdapterRegistry>,
    calculations: HashMap<RegionConnectorId, DataNeedCalculationService>,
    clock: Arc<dyn Clock>,
}

impl PermissionOrchestrator {
    /// One calculation service per registered connector, all reading the
    /// same catalog.
    #[must_use]
    pub fn new(
        outbox: Arc<Outbox>,
        adapters: Arc<AdapterRegistry>,
        catalog: Arc<dyn DataNeedCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let calculations = adapters
            .iter()
            .map(|(id, adapter)| {
                let service = DataNeedCalculationService::new(
                    catalog.clone(),
                    adapter.connector.metadata(),
                    adapter.connector.rule_set(),
                    clock.clone(),
                );
                (id.clone(), service)
            })
            .collect();
        Self {
            outbox,
            adapters,
            calculations,
            clock,
        }
    }

    /// Create a permission request and push it as far as it goes without
    /// the administrator.
    ///
    /// # Errors
    ///
    /// `Registry` for an unknown connector (nothing is committed), `Store`
    /// if the ledger refuses an event.
    pub async fn create(&self, command: CreatePermission) -> Result<CreatedPermission, OrchestratorError> {
        let connector = self.adapters.connector(&command.region_connector_id)?;
        let Some(calculation) = self.calculations.get(&command.region_connector_id) else {
            return Err(RegistryError::UnknownAdapter {
                id: command.region_connector_id,
            }
            .into());
        };

        let permission_id = PermissionId::generate();
        let details = PermissionDetails {
            connection_id: command.connection_id,
            data_need_id: command.data_need_id.clone(),
            data_source: connector.data_source(),
        };
        self.outbox
            .commit(PermissionEvent::created(permission_id.clone(), details, self.clock.now()))
            .await?;
        PERMISSIONS_CREATED
            .with_label_values(&[command.region_connector_id.as_str()])
            .inc();

        let status = match calculation.calculate(&command.data_need_id) {
            DataNeedCalculation::NotFound => {
                let event = PermissionEvent::new(permission_id.clone(), PermissionStatus::Malformed, self.clock.now())
                    .with_validation_errors(vec![ValidationError::new(
                        "data_need_id",
                        format!("Unknown data need {}", command.data_need_id),
                    )]);
                self.outbox.commit(event).await?.status
            }
            DataNeedCalculation::NotSupported { message } => {
                let event = PermissionEvent::new(
                    permission_id.clone(),
                    PermissionStatus::Unfulfillable,
                    self.clock.now(),
                )
                .with_reason(message);
                self.outbox.commit(event).await?.status
            }
            DataNeedCalculation::ValidatedHistoricalData {
                permission_timeframe: validity,
                ..
            }
            | DataNeedCalculation::AccountingPoint {
                permission_timeframe: validity,
            } => {
                let event = PermissionEvent::new(permission_id.clone(), PermissionStatus::Validated, self.clock.now())
                    .with_payload(EventPayload::Validated { validity });
                self.outbox.commit(event).await?;
                self.send(&permission_id, connector.as_ref()).await?
            }
        };

        info!(
            permission_id = %permission_id,
            region_connector = %command.region_connector_id,
            status = %status,
            "Permission request created"
        );
        Ok(CreatedPermission {
            permission_id,
            status,
        })
    }

    /// Hand a validated request to the connector.
    async fn send(
        &self,
        permission_id: &PermissionId,
        connector: &dyn RegionConnector,
    ) -> Result<PermissionStatus, OrchestratorError> {
        let request = self.request(permission_id)?;
        let event = match connector.create_permission(&request).await {
            Ok(()) => PermissionEvent::new(
                permission_id.clone(),
                PermissionStatus::SentToAdministrator,
                self.clock.now(),
            ),
            Err(e) => {
                warn!(permission_id = %permission_id, error = %e, "Could not send permission request");
                PermissionEvent::new(permission_id.clone(), PermissionStatus::UnableToSend, self.clock.now())
                    .with_reason(e.to_string())
            }
        };

        match self
            .outbox
            .commit_if_status(event, PermissionStatus::Validated)
            .await
        {
            Ok(committed) => Ok(committed.status),
            // The administrator answered before we recorded the send
            Err(StoreError::StatusChanged { actual: Some(actual), .. }) => {
                debug!(permission_id = %permission_id, status = %actual, "Send overtaken by administrator");
                Ok(actual)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Revoke a permission at its connector, then record `Revoked`.
    ///
    /// # Errors
    ///
    /// `UnknownPermission` if nothing was committed for `permission_id`,
    /// `Adapter` if the connector refuses (nothing is committed), `Store`
    /// if the permission already reached a terminal status or changed
    /// status in the meantime.
    pub async fn revoke(&self, permission_id: &PermissionId) -> Result<PermissionStatus, OrchestratorError> {
        let request = self.request(permission_id)?;
        let at_administrator = !request.status.is_terminal()
            && !matches!(request.status, PermissionStatus::Created | PermissionStatus::Validated);
        if at_administrator {
            let connector = self.adapters.connector(&request.data_source.region_connector_id)?;
            connector.revoke(permission_id).await?;
        }

        let event = PermissionEvent::new(permission_id.clone(), PermissionStatus::Revoked, self.clock.now());
        let committed = self.outbox.commit_if_status(event, request.status).await?;
        info!(permission_id = %permission_id, previous_status = %request.status, "Permission revoked");
        Ok(committed.status)
    }

    /// Record a status change reported by a connector.
    ///
    /// # Errors
    ///
    /// `UnknownPermission` or `ForeignPermission` when the update does not
    /// belong to `region_connector_id`; `Store` if the transition is refused.
    pub async fn apply_status_update(
        &self,
        region_connector_id: &RegionConnectorId,
        update: AdapterStatusUpdate,
    ) -> Result<PermissionEvent, OrchestratorError> {
        let request = self.request(&update.permission_id)?;
        let owner = request.data_source.region_connector_id;
        if &owner != region_connector_id {
            return Err(OrchestratorError::ForeignPermission {
                permission_id: update.permission_id,
                owner,
                region_connector_id: region_connector_id.clone(),
            });
        }

        let visibility = update.visibility_given(request.status);
        let event = PermissionEvent::new(update.permission_id, update.status, self.clock.now())
            .with_visibility(visibility);
        let event = match (update.data, update.reason) {
            (Some(data), reason) => event.with_payload(EventPayload::Adapter {
                adapter_id: region_connector_id.clone(),
                reason,
                data,
            }),
            (None, Some(reason)) => event.with_reason(reason),
            (None, None) => event,
        };
        debug!(
            permission_id = %event.permission_id,
            status = %event.status,
            visibility = ?visibility,
            region_connector = %region_connector_id,
            "Applying connector status update"
        );
        Ok(self.outbox.commit(event).await?)
    }

    /// Current projection of one permission, straight from the ledger.
    fn request(&self, permission_id: &PermissionId) -> Result<PermissionRequest, OrchestratorError> {
        let history = self
            .outbox
            .ledger()
            .history(permission_id)
            .map_err(StoreError::from)?;
        PermissionRequest::replay(&history)
            .ok_or_else(|| OrchestratorError::UnknownPermission(permission_id.clone()))
    }
}
