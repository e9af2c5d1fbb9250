//! # Projection
//!
//! ```text
//! [Created] → [Validated] → [SentToAdministrator] → [PendingAcknowledgement]
//!     │            │                 │                        │
//!     ↓            ↓                 ↓                        ↓
//! [Malformed] [Unfulfillable]  [UnableToSend]     [Accepted] / [Rejected]
//!                                                      │
//!                                   [WaitingForStart] → [StreamingData] → [Fulfilled]
//! ```
//!
//! Any non-terminal status may also move to Revoked, Terminated, TimedOut,
//! Cancelled, Withdrawn or NotSatisfied. Nothing leaves a terminal status.

use super::errors::TransitionError;
use shared_types::{PermissionEvent, PermissionStatus};

/// Status of the event maximal by `(event_created, sequence)`.
///
/// `None` for an empty history.
pub fn project<'a, I>(events: I) -> Option<PermissionStatus>
where
    I: IntoIterator<Item = &'a PermissionEvent>,
{
    events
        .into_iter()
        .max_by_key(|event| event.ordering_key())
        .map(|event| event.status)
}

/// Reject any event for a permission whose projected status is terminal.
pub fn check_transition(
    current: Option<PermissionStatus>,
    attempted: PermissionStatus,
) -> Result<(), TransitionError> {
    match current {
        Some(current) if current.is_terminal() => {
            Err(TransitionError::TerminalPermission { current, attempted })
        }
        _ => Ok(()),
    }
}
