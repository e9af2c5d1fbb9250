//! # Identifiers
//!
//! String-backed newtypes for the identifiers that flow between components.
//! Keeping them distinct prevents passing a connection id where a permission
//! id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Globally unique identifier of a permission request.
    PermissionId
);
string_id!(
    /// Identifier the eligible party uses to correlate a customer connection.
    ConnectionId
);
string_id!(
    /// Identifier of a submitted data need.
    DataNeedId
);
string_id!(
    /// Identifier of a region connector (adapter), e.g. `at-eda`.
    RegionConnectorId
);

impl PermissionId {
    /// Generate a fresh random permission id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Identifier of one committed event record.
///
/// Equal to the store sequence number, which is unique across the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventRecordId(pub u64);

impl fmt::Display for EventRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
