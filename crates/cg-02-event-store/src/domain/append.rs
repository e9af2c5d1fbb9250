//! Append guards, evaluated under the permission's lock.

use super::errors::StoreError;
use cg_01_permission_projection::{check_transition, project};
use shared_types::{EventPayload, PermissionEvent, PermissionStatus};

/// Precondition of an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendCondition {
    Unconditional,
    /// Only append if the projected status is still this one.
    StatusIs(PermissionStatus),
}

/// Check `event` against the permission's current history.
pub fn check_append(
    history: &[PermissionEvent],
    event: &PermissionEvent,
    condition: AppendCondition,
) -> Result<(), StoreError> {
    let creates = matches!(event.payload, Some(EventPayload::Created { .. }));

    if history.is_empty() {
        if !creates {
            return Err(StoreError::UnknownPermission(event.permission_id.clone()));
        }
    } else if creates {
        return Err(StoreError::DuplicatePermission(event.permission_id.clone()));
    }

    let current = project(history);
    check_transition(current, event.status).map_err(|source| StoreError::Transition {
        permission_id: event.permission_id.clone(),
        source,
    })?;

    if let AppendCondition::StatusIs(expected) = condition {
        if current != Some(expected) {
            return Err(StoreError::StatusChanged {
                permission_id: event.permission_id.clone(),
                expected,
                actual: current,
            });
        }
    }

    Ok(())
}
