//! # Permission Status Taxonomy
//!
//! The single canonical list of permission statuses. Every view that needs to
//! know whether a permission is still "in flight" derives that from
//! [`PermissionStatus::is_terminal`] instead of keeping its own list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionStatus {
    // =========================================================================
    // NON-TERMINAL
    // =========================================================================
    /// Request received, nothing checked yet.
    Created,
    /// Request passed validation and has a computed validity window.
    Validated,
    /// Request was handed to the permission administrator.
    SentToAdministrator,
    /// Administrator received the request, acknowledgement outstanding.
    PendingAcknowledgement,
    /// Customer accepted the request.
    Accepted,
    /// Accepted, but the validity window has not started yet.
    WaitingForStart,
    /// Data is flowing.
    StreamingData,

    // =========================================================================
    // TERMINAL
    // =========================================================================
    /// All requested data was delivered.
    Fulfilled,
    /// Customer rejected the request.
    Rejected,
    /// Eligible party terminated the permission.
    Terminated,
    /// Customer revoked the permission.
    Revoked,
    /// Request did not progress in time.
    TimedOut,
    /// Request could not be delivered to the administrator.
    UnableToSend,
    /// Request failed validation.
    Malformed,
    /// No adapter can deliver what the data need asks for.
    Unfulfillable,
    /// Request was cancelled before acceptance.
    Cancelled,
    /// Request was withdrawn by the eligible party.
    Withdrawn,
    /// Administrator reported the request could not be satisfied.
    NotSatisfied,
}

impl PermissionStatus {
    /// Statuses a permission can still leave.
    pub const NON_TERMINAL: [PermissionStatus; 7] = [
        Self::Created,
        Self::Validated,
        Self::SentToAdministrator,
        Self::PendingAcknowledgement,
        Self::Accepted,
        Self::WaitingForStart,
        Self::StreamingData,
    ];

    /// Absorbing statuses.
    pub const TERMINAL: [PermissionStatus; 11] = [
        Self::Fulfilled,
        Self::Rejected,
        Self::Terminated,
        Self::Revoked,
        Self::TimedOut,
        Self::UnableToSend,
        Self::Malformed,
        Self::Unfulfillable,
        Self::Cancelled,
        Self::Withdrawn,
        Self::NotSatisfied,
    ];

    /// Whether the status is absorbing.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            Self::Created
                | Self::Validated
                | Self::SentToAdministrator
                | Self::PendingAcknowledgement
                | Self::Accepted
                | Self::WaitingForStart
                | Self::StreamingData
        )
    }

    /// Whether data may currently be requested under this permission.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Accepted | Self::StreamingData | Self::Fulfilled)
    }

    /// Every status, non-terminal first.
    pub fn all() -> impl Iterator<Item = PermissionStatus> {
        Self::NON_TERMINAL.into_iter().chain(Self::TERMINAL)
    }

    /// Stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Validated => "VALIDATED",
            Self::SentToAdministrator => "SENT_TO_ADMINISTRATOR",
            Self::PendingAcknowledgement => "PENDING_ACKNOWLEDGEMENT",
            Self::Accepted => "ACCEPTED",
            Self::WaitingForStart => "WAITING_FOR_START",
            Self::StreamingData => "STREAMING_DATA",
            Self::Fulfilled => "FULFILLED",
            Self::Rejected => "REJECTED",
            Self::Terminated => "TERMINATED",
            Self::Revoked => "REVOKED",
            Self::TimedOut => "TIMED_OUT",
            Self::UnableToSend => "UNABLE_TO_SEND",
            Self::Malformed => "MALFORMED",
            Self::Unfulfillable => "UNFULFILLABLE",
            Self::Cancelled => "CANCELLED",
            Self::Withdrawn => "WITHDRAWN",
            Self::NotSatisfied => "NOT_SATISFIED",
        }
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
