//! # Permission Event Store (cg-02)
//!
//! Append-only ledger of permission events and the outbox that publishes
//! each committed event to the bus.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Durable before success | `adapters/file.rs` - `sync_data` before returning |
//! | First event of a permission carries `Created` | `domain/append.rs` - `check_append()` |
//! | Terminal statuses are absorbing | `domain/append.rs` - via `check_transition()` |
//! | Same-permission appends are serialized | `domain/streams.rs` - per-stream lock |
//! | Publish only what was committed | `service.rs` - `Outbox::commit_with()` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service.rs - Outbox (commit, commit_if_status)                 │
//! │  adapters/  - InMemoryEventLedger, FileEventLedger, LedgerLock  │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements / uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - EventLedger, RetentionCleanup              │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/ - append guards, permission streams, errors            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{FileEventLedger, InMemoryEventLedger, LedgerHistory};
pub use domain::{AppendCondition, LedgerError, StoreError};
pub use ports::{EventLedger, RetentionCleanup};
pub use service::Outbox;
