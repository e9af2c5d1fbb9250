//! # Region Connector Contracts
//!
//! The seams between the core and the region-specific protocol clients. The
//! core never knows a connector's wire protocol; it only sees these traits.

use crate::data_need::{DataNeedRuleSet, Period};
use crate::envelope::DocumentKind;
use crate::errors::AdapterError;
use crate::events::{DataSourceInformation, EventVisibility};
use crate::ids::{ConnectionId, DataNeedId, PermissionId, RegionConnectorId};
use crate::permission::PermissionRequest;
use crate::retransmission::{RetransmissionRequest, RetransmissionResult};
use crate::status::PermissionStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream};
use serde::{Deserialize, Serialize};

/// Static description of a region connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConnectorMetadata {
    pub id: RegionConnectorId,
    pub country_code: String,
    /// Earliest start of energy data relative to today (usually negative).
    pub earliest_start: Period,
    /// Latest end of energy data relative to today.
    pub latest_end: Period,
}

/// One reading delivered by a connector, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub permission_id: PermissionId,
    pub connection_id: ConnectionId,
    pub data_need_id: DataNeedId,
    pub kind: DocumentKind,
    pub received: DateTime<Utc>,
    pub payload: serde_json::Value,
}

/// A status change reported by the permission administrator through a
/// connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterStatusUpdate {
    pub permission_id: PermissionId,
    pub status: PermissionStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Unset lets [`Self::visibility_given`] decide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<EventVisibility>,
}

impl AdapterStatusUpdate {
    #[must_use]
    pub fn new(permission_id: PermissionId, status: PermissionStatus) -> Self {
        Self {
            permission_id,
            status,
            reason: None,
            data: None,
            visibility: None,
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Keep the resulting event away from the eligible party.
    #[must_use]
    pub fn internal(mut self) -> Self {
        self.visibility = Some(EventVisibility::Internal);
        self
    }

    #[must_use]
    pub fn external(mut self) -> Self {
        self.visibility = Some(EventVisibility::External);
        self
    }

    /// Visibility of the event this update commits on a permission currently
    /// in `current`.
    ///
    /// An explicit choice wins. Otherwise an update that only attaches
    /// connector data without moving the status or giving a reason is
    /// bookkeeping and stays internal; everything else is external.
    #[must_use]
    pub fn visibility_given(&self, current: PermissionStatus) -> EventVisibility {
        match self.visibility {
            Some(visibility) => visibility,
            None if self.data.is_some() && self.reason.is_none() && self.status == current => {
                EventVisibility::Internal
            }
            None => EventVisibility::External,
        }
    }
}

/// Inbound adapter contract.
#[async_trait]
pub trait RegionConnector: Send + Sync {
    fn metadata(&self) -> RegionConnectorMetadata;

    fn rule_set(&self) -> DataNeedRuleSet;

    /// Data source recorded on permissions created through this connector.
    /// Defaults to the connector acting as its own administrators.
    fn data_source(&self) -> DataSourceInformation {
        let metadata = self.metadata();
        DataSourceInformation {
            permission_administrator_id: metadata.id.to_string(),
            metered_data_administrator_id: metadata.id.to_string(),
            region_connector_id: metadata.id,
            country_code: metadata.country_code,
        }
    }

    /// Forward a validated request to the permission administrator.
    async fn create_permission(&self, request: &PermissionRequest) -> Result<(), AdapterError>;

    /// Revoke or terminate a permission at the administrator.
    async fn revoke(&self, permission_id: &PermissionId) -> Result<(), AdapterError>;

    /// Readings as they arrive. Errors are per item.
    fn readings(&self) -> BoxStream<'static, Result<RawReading, AdapterError>>;

    /// Administrator-side status changes.
    fn status_updates(&self) -> BoxStream<'static, AdapterStatusUpdate> {
        Box::pin(stream::empty())
    }
}

/// Retransmission adapter contract.
#[async_trait]
pub trait RegionConnectorRetransmissionService: Send + Sync {
    async fn request_retransmission(
        &self,
        request: &RetransmissionRequest,
    ) -> Result<RetransmissionResult, AdapterError>;
}
