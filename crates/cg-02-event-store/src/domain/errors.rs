use cg_01_permission_projection::TransitionError;
use shared_types::{PermissionId, PermissionStatus};
use std::path::PathBuf;
use thiserror::Error;

/// Infrastructure failure of a ledger backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// A committed line could not be read back.
    #[error("Corrupt ledger at line {line}: {message}")]
    Corrupt { line: usize, message: String },

    /// Another process holds the ledger.
    #[error("Ledger already in use ({})", .path.display())]
    Locked { path: PathBuf },
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization {
            message: e.to_string(),
        }
    }
}

/// Why a commit did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Persisting failed; nothing was committed.
    #[error("Ledger failure: {0}")]
    Ledger(#[from] LedgerError),

    /// The event would leave a terminal status.
    #[error("Transition rejected for {permission_id}: {source}")]
    Transition {
        permission_id: PermissionId,
        source: TransitionError,
    },

    /// A conditional commit found a different status.
    #[error("Status of {permission_id} changed: expected {expected}, found {actual:?}")]
    StatusChanged {
        permission_id: PermissionId,
        expected: PermissionStatus,
        actual: Option<PermissionStatus>,
    },

    /// First event of a permission without a `Created` payload.
    #[error("Unknown permission: {0}")]
    UnknownPermission(PermissionId),

    /// A second `Created` payload for an existing permission.
    #[error("Permission already exists: {0}")]
    DuplicatePermission(PermissionId),
}

impl StoreError {
    /// Label for the rejected-commit counter.
    #[must_use]
    pub fn metric_reason(&self) -> &'static str {
        match self {
            Self::Ledger(_) => "ledger",
            Self::Transition { .. } => "terminal",
            Self::StatusChanged { .. } => "status_changed",
            Self::UnknownPermission(_) => "unknown_permission",
            Self::DuplicatePermission(_) => "duplicate_permission",
        }
    }
}
