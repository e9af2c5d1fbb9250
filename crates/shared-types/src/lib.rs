//! # Shared Types Crate
//!
//! This crate contains the domain vocabulary used by every Consent-Grid
//! component: identifiers, the canonical permission status taxonomy,
//! permission events, data needs and their rules, market-document envelopes
//! and the region-connector contracts.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-crate type is defined here.
//! - **One Taxonomy**: terminal and non-terminal statuses are defined once in
//!   [`PermissionStatus`]; all views derive from it.
//! - **Events, not mutation**: a [`PermissionRequest`] is only ever rebuilt
//!   from its [`PermissionEvent`] history.

pub mod adapter;
pub mod clock;
pub mod data_need;
pub mod envelope;
pub mod errors;
pub mod events;
pub mod ids;
pub mod permission;
pub mod retransmission;
pub mod status;
pub mod timeframe;

pub use adapter::{
    AdapterStatusUpdate, RawReading, RegionConnector, RegionConnectorMetadata,
    RegionConnectorRetransmissionService,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use data_need::{
    DataNeed, DataNeedDuration, DataNeedKind, DataNeedRule, DataNeedRuleSet, EnergyType,
    Granularity, Period, RegionConnectorFilter, RegionConnectorFilterType,
};
pub use envelope::{DocumentKind, DocumentStreamKey, EnvelopeHeader, MarketDocumentEnvelope, SchemaVersion};
pub use errors::{AdapterError, TimeframeError};
pub use events::{
    DataSourceInformation, EventPayload, EventVisibility, PermissionDetails, PermissionEvent,
    ValidationError,
};
pub use ids::{ConnectionId, DataNeedId, EventRecordId, PermissionId, RegionConnectorId};
pub use permission::PermissionRequest;
pub use retransmission::{RetransmissionOutcome, RetransmissionRequest, RetransmissionResult};
pub use status::PermissionStatus;
pub use timeframe::Timeframe;
