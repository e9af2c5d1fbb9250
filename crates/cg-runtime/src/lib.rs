//! # Consent-Grid Runtime Library
//!
//! Wires the components into one process. The `consent-grid` binary is a
//! thin shell around [`ConsentGrid`]; the integration tests drive the same
//! type directly.
//!
//! ## Flow
//!
//! ```text
//! create ─→ PermissionOrchestrator ─→ Outbox ─→ ledger ─→ bus
//!                  │                                       │
//!                  ↓                          ┌────────────┼─────────────┐
//!           RegionConnector                   ↓            ↓             ↓
//!            │        │                 Persistence   Notification   Reclaimer
//!   status updates  readings            (read model)  (status msgs)  (TimedOut)
//!            │        │
//!            ↓        ↓
//!   orchestrator   DocumentPipeline ─→ DocumentBrokerRegistry ─→ consumers
//!                                                   ↑
//!                  bus (External) ─→ PermissionDocumentProducer
//! ```
//!
//! ## Modules
//!
//! - `config` - TOML file plus `CG_*` environment overrides
//! - `registry` - explicit startup registry of region connectors
//! - `orchestrator` - create, revoke, administrator status updates
//! - `documents` - raw readings to market document envelopes
//! - `permission_documents` - permission events to permission market documents
//! - `simulation` - in-process connector for demos and tests
//! - `runtime` - construction, startup and shutdown

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod documents;
pub mod orchestrator;
pub mod permission_documents;
pub mod registry;
pub mod runtime;
pub mod simulation;

pub use config::{AdapterConfig, AdapterKind, ConfigError, LedgerBackend, RuntimeConfig};
pub use documents::DocumentPipeline;
pub use orchestrator::{CreatePermission, CreatedPermission, OrchestratorError, PermissionOrchestrator};
pub use permission_documents::{
    PermissionDocument, PermissionDocumentError, PermissionDocumentProducer, PermissionRecord,
};
pub use registry::{AdapterRegistry, RegisteredAdapter, RegistryError};
pub use runtime::{AdapterContext, ConsentGrid, RuntimeError, SHUTDOWN_GRACE};
pub use simulation::{SimulationConnector, SimulationRetransmissionService};
