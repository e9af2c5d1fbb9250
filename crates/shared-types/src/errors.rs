//! # Error Types
//!
//! Errors shared across crates. Component-specific errors live in their own
//! crate's `error` module.

use chrono::NaiveDate;
use thiserror::Error;

/// A timeframe whose end lies before its start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid timeframe: start {start} is after end {end}")]
pub struct TimeframeError {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Errors reported by a region connector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// The adapter could not reach its upstream system.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    /// The upstream system refused the request.
    #[error("Request rejected by upstream: {0}")]
    Rejected(String),

    /// The adapter does not know the permission.
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    /// Anything else.
    #[error("Adapter error: {0}")]
    Other(String),
}
