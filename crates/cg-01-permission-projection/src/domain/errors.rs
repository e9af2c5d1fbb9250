use shared_types::PermissionStatus;
use thiserror::Error;

/// A state-machine violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The permission already reached a terminal status.
    #[error("Permission is terminal ({current}), cannot record {attempted}")]
    TerminalPermission {
        current: PermissionStatus,
        attempted: PermissionStatus,
    },
}

/// Reading a permission's history failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("Event history unavailable: {0}")]
    Unavailable(String),
}
