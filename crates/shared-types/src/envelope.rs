//! # Market Document Envelope
//!
//! The routing wrapper around a normalized market document. The broker reads
//! only the header; the payload stays opaque JSON.
//!
//! - **Versioning**: every envelope names its [`SchemaVersion`], and brokers
//!   are keyed by `(DocumentKind, SchemaVersion)`.
//! - **Correlation**: `connection_id`, `permission_id` and `data_need_id` let a
//!   consumer tie a document back to the request that produced it.

use crate::ids::{ConnectionId, DataNeedId, PermissionId, RegionConnectorId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Family of normalized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    ValidatedHistoricalData,
    AccountingPointData,
    PermissionMarketDocument,
    RawData,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ValidatedHistoricalData => "validated_historical_data",
            Self::AccountingPointData => "accounting_point_data",
            Self::PermissionMarketDocument => "permission_market_document",
            Self::RawData => "raw_data",
        };
        f.write_str(name)
    }
}

/// Schema revision of the document payload, e.g. `"0.82"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaVersion(pub String);

impl SchemaVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of one document stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentStreamKey {
    pub kind: DocumentKind,
    pub version: SchemaVersion,
}

impl DocumentStreamKey {
    pub fn new(kind: DocumentKind, version: SchemaVersion) -> Self {
        Self { kind, version }
    }
}

impl fmt::Display for DocumentStreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.version)
    }
}

/// Routing header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    pub connection_id: ConnectionId,
    pub permission_id: PermissionId,
    pub data_need_id: DataNeedId,
    pub region_connector_id: RegionConnectorId,
    pub country: String,
    pub created: DateTime<Utc>,
    pub kind: DocumentKind,
    pub version: SchemaVersion,
}

/// A normalized document ready for fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDocumentEnvelope {
    pub header: EnvelopeHeader,
    pub payload: serde_json::Value,
}

impl MarketDocumentEnvelope {
    #[must_use]
    pub fn stream_key(&self) -> DocumentStreamKey {
        DocumentStreamKey::new(self.header.kind, self.header.version.clone())
    }
}
