//! Domain layer: append guards, per-permission streams and errors.

pub mod append;
pub mod errors;
pub mod streams;

pub use append::{check_append, AppendCondition};
pub use errors::{LedgerError, StoreError};
pub use streams::PermissionStreams;
