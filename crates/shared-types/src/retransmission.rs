//! # Retransmission
//!
//! Request to re-deliver already validated data for a past window, and the
//! closed set of outcomes.

use crate::ids::{PermissionId, RegionConnectorId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetransmissionRequest {
    pub region_connector_id: RegionConnectorId,
    pub permission_id: PermissionId,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Outcome discriminator, used for metrics labels and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetransmissionOutcome {
    Success,
    Failure,
    DataNotAvailable,
    NoActivePermission,
    NoPermissionForTimeFrame,
    NotSupported,
    PermissionRequestNotFound,
    RetransmissionServiceNotFound,
}

impl RetransmissionOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::DataNotAvailable => "data_not_available",
            Self::NoActivePermission => "no_active_permission",
            Self::NoPermissionForTimeFrame => "no_permission_for_time_frame",
            Self::NotSupported => "not_supported",
            Self::PermissionRequestNotFound => "permission_request_not_found",
            Self::RetransmissionServiceNotFound => "retransmission_service_not_found",
        }
    }
}

/// Result of a retransmission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RetransmissionResult {
    Success {
        permission_id: PermissionId,
        timestamp: DateTime<Utc>,
    },
    Failure {
        permission_id: PermissionId,
        timestamp: DateTime<Utc>,
        reason: String,
    },
    DataNotAvailable {
        permission_id: PermissionId,
        timestamp: DateTime<Utc>,
    },
    NoActivePermission {
        permission_id: PermissionId,
        timestamp: DateTime<Utc>,
    },
    NoPermissionForTimeFrame {
        permission_id: PermissionId,
        timestamp: DateTime<Utc>,
    },
    NotSupported {
        permission_id: PermissionId,
        timestamp: DateTime<Utc>,
        reason: String,
    },
    PermissionRequestNotFound {
        permission_id: PermissionId,
        timestamp: DateTime<Utc>,
    },
    RetransmissionServiceNotFound {
        permission_id: PermissionId,
        region_connector_id: RegionConnectorId,
        timestamp: DateTime<Utc>,
    },
}

impl RetransmissionResult {
    #[must_use]
    pub fn outcome(&self) -> RetransmissionOutcome {
        match self {
            Self::Success { .. } => RetransmissionOutcome::Success,
            Self::Failure { .. } => RetransmissionOutcome::Failure,
            Self::DataNotAvailable { .. } => RetransmissionOutcome::DataNotAvailable,
            Self::NoActivePermission { .. } => RetransmissionOutcome::NoActivePermission,
            Self::NoPermissionForTimeFrame { .. } => RetransmissionOutcome::NoPermissionForTimeFrame,
            Self::NotSupported { .. } => RetransmissionOutcome::NotSupported,
            Self::PermissionRequestNotFound { .. } => RetransmissionOutcome::PermissionRequestNotFound,
            Self::RetransmissionServiceNotFound { .. } => {
                RetransmissionOutcome::RetransmissionServiceNotFound
            }
        }
    }

    #[must_use]
    pub fn permission_id(&self) -> &PermissionId {
        match self {
            Self::Success { permission_id, .. }
            | Self::Failure { permission_id, .. }
            | Self::DataNotAvailable { permission_id, .. }
            | Self::NoActivePermission { permission_id, .. }
            | Self::NoPermissionForTimeFrame { permission_id, .. }
            | Self::NotSupported { permission_id, .. }
            | Self::PermissionRequestNotFound { permission_id, .. }
            | Self::RetransmissionServiceNotFound { permission_id, .. } => permission_id,
        }
    }

    /// HTTP-style status code for the transport layer.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.outcome() {
            RetransmissionOutcome::Success => 200,
            RetransmissionOutcome::DataNotAvailable => 204,
            RetransmissionOutcome::NoActivePermission => 410,
            RetransmissionOutcome::NoPermissionForTimeFrame
            | RetransmissionOutcome::NotSupported => 409,
            RetransmissionOutcome::PermissionRequestNotFound
            | RetransmissionOutcome::RetransmissionServiceNotFound => 404,
            RetransmissionOutcome::Failure => 500,
        }
    }
}
