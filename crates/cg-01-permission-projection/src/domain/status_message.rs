//! # Connection Status Message
//!
//! What the eligible party sees about a permission: one message per
//! externally visible event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{
    ConnectionId, DataNeedId, DataSourceInformation, EventPayload, PermissionEvent, PermissionId,
    PermissionRequest, PermissionStatus,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatusMessage {
    pub connection_id: ConnectionId,
    pub permission_id: PermissionId,
    pub data_need_id: DataNeedId,
    pub data_source: DataSourceInformation,
    pub timestamp: DateTime<Utc>,
    pub status: PermissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_information: Option<serde_json::Value>,
}

impl ConnectionStatusMessage {
    /// Build the message for `event` using the request's identifying
    /// attributes.
    #[must_use]
    pub fn from_event(request: &PermissionRequest, event: &PermissionEvent) -> Self {
        let (message, additional_information) = match &event.payload {
            Some(EventPayload::Annotated { reason }) => (Some(reason.clone()), None),
            Some(EventPayload::Adapter { reason, data, .. }) => (reason.clone(), Some(data.clone())),
            _ if !event.validation_errors.is_empty() => {
                let joined = event
                    .validation_errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                (Some(joined), None)
            }
            _ => (None, None),
        };

        Self {
            connection_id: request.connection_id.clone(),
            permission_id: request.permission_id.clone(),
            data_need_id: request.data_need_id.clone(),
            data_source: request.data_source.clone(),
            timestamp: event.event_created,
            status: event.status,
            message,
            additional_information,
        }
    }
}
