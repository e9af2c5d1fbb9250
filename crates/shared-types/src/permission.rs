//! # Permission Request
//!
//! The read model of a permission. It has no setters: the only way to obtain
//! one is [`PermissionRequest::replay`] over the permission's event history.

use crate::events::{DataSourceInformation, EventPayload, PermissionDetails, PermissionEvent};
use crate::ids::{ConnectionId, DataNeedId, PermissionId};
use crate::status::PermissionStatus;
use crate::timeframe::Timeframe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A permission request as derived from its events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub permission_id: PermissionId,
    pub connection_id: ConnectionId,
    pub data_need_id: DataNeedId,
    pub data_source: DataSourceInformation,
    pub status: PermissionStatus,
    pub validity: Option<Timeframe>,
    pub reason: Option<String>,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl PermissionRequest {
    /// Rebuild a request from its events, in any order.
    ///
    /// Returns `None` when the history holds no `Created` payload. Status is
    /// taken from the event that is maximal by `(event_created, sequence)`;
    /// validity and reason from the latest event carrying them.
    pub fn replay<'a, I>(events: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a PermissionEvent>,
    {
        let mut ordered: Vec<&PermissionEvent> = events.into_iter().collect();
        ordered.sort_by_key(|e| e.ordering_key());

        let (created_event, details) = ordered.iter().find_map(|e| match &e.payload {
            Some(EventPayload::Created { details }) => Some((*e, details)),
            _ => None,
        })?;
        let latest = ordered.last()?;

        let mut validity = None;
        let mut reason = None;
        for event in &ordered {
            match &event.payload {
                Some(EventPayload::Validated { validity: v }) => validity = Some(*v),
                Some(EventPayload::Annotated { reason: r })
                | Some(EventPayload::Adapter { reason: Some(r), .. }) => reason = Some(r.clone()),
                _ => {}
            }
        }

        let PermissionDetails {
            connection_id,
            data_need_id,
            data_source,
        } = details.clone();

        Some(Self {
            permission_id: created_event.permission_id.clone(),
            connection_id,
            data_need_id,
            data_source,
            status: latest.status,
            validity,
            reason,
            created: created_event.event_created,
            last_updated: latest.event_created,
        })
    }
}
