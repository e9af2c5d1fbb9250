//! # Permission State Projection (cg-01)
//!
//! Derives the current state of a permission request from its event history
//! and keeps the queryable read model and connection status messages in sync
//! with the event bus.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Status is the status of the event maximal by `(event_created, sequence)` | `domain/projection.rs` - `project()` |
//! | Terminal statuses are absorbing | `domain/projection.rs` - `check_transition()` |
//! | The read model is a pure function of the history | `extensions/persistence.rs` - re-projects, never patches |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  extensions/ - Event bus subscribers (persistence, notification)│
//! │  adapters/   - In-memory permission request repository          │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements / uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - PermissionEventHistory,                    │
//! │                      PermissionRequestRepository                │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/projection.rs     - project(), check_transition()       │
//! │  domain/status_message.rs - ConnectionStatusMessage             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod extensions;
pub mod ports;

pub use adapters::InMemoryPermissionRequestRepository;
pub use domain::errors::{HistoryError, TransitionError};
pub use domain::projection::{check_transition, project};
pub use domain::status_message::ConnectionStatusMessage;
pub use extensions::{NotificationExtension, PersistenceExtension};
pub use ports::outbound::{PermissionEventHistory, PermissionRequestRepository};
