//! # Permission Events
//!
//! The append-only facts a permission request is rebuilt from. One generic
//! event type carries a `kind`-tagged payload; adapter-specific details travel
//! as opaque JSON in [`EventPayload::Adapter`].

use crate::ids::{ConnectionId, DataNeedId, PermissionId, RegionConnectorId};
use crate::status::PermissionStatus;
use crate::timeframe::Timeframe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who may see an event outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventVisibility {
    /// Bookkeeping only.
    Internal,
    /// Forwarded to the eligible party as a connection status message.
    External,
}

/// A single failed validation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Where the data for a permission comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceInformation {
    pub region_connector_id: RegionConnectorId,
    /// ISO 3166-1 alpha-2 code.
    pub country_code: String,
    pub permission_administrator_id: String,
    pub metered_data_administrator_id: String,
}

/// Immutable identifying attributes of a permission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDetails {
    pub connection_id: ConnectionId,
    pub data_need_id: DataNeedId,
    pub data_source: DataSourceInformation,
}

/// Event payload, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    Created { details: PermissionDetails },
    Validated { validity: Timeframe },
    Annotated { reason: String },
    /// Connector-specific data, optionally with the administrator's reason.
    Adapter {
        adapter_id: RegionConnectorId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        data: serde_json::Value,
    },
}

/// An append-only fact about one permission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionEvent {
    pub permission_id: PermissionId,
    pub status: PermissionStatus,
    pub event_created: DateTime<Utc>,
    /// Assigned by the event store at commit; `0` until then.
    #[serde(default)]
    pub sequence: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<ValidationError>,
    pub visibility: EventVisibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,
}

impl PermissionEvent {
    /// A bare status event. Visibility defaults to `External`.
    pub fn new(
        permission_id: PermissionId,
        status: PermissionStatus,
        event_created: DateTime<Utc>,
    ) -> Self {
        Self {
            permission_id,
            status,
            event_created,
            sequence: 0,
            validation_errors: Vec::new(),
            visibility: EventVisibility::External,
            payload: None,
        }
    }

    /// The event that brings a permission into existence.
    pub fn created(
        permission_id: PermissionId,
        details: PermissionDetails,
        event_created: DateTime<Utc>,
    ) -> Self {
        Self::new(permission_id, PermissionStatus::Created, event_created)
            .with_payload(EventPayload::Created { details })
    }

    #[must_use]
    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: EventVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_validation_errors(mut self, errors: Vec<ValidationError>) -> Self {
        self.validation_errors = errors;
        self
    }

    #[must_use]
    pub fn with_reason(self, reason: impl Into<String>) -> Self {
        self.with_payload(EventPayload::Annotated {
            reason: reason.into(),
        })
    }

    /// Total order of events within one permission.
    #[must_use]
    pub fn ordering_key(&self) -> (DateTime<Utc>, u64) {
        (self.event_created, self.sequence)
    }

    #[must_use]
    pub fn is_external(&self) -> bool {
        self.visibility == EventVisibility::External
    }
}
