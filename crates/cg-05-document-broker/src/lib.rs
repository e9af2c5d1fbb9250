//! # Document Broker (cg-05)
//!
//! Fan-out of normalized market documents, one broker per
//! `(DocumentKind, SchemaVersion)`.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement |
//! |----|-----------|-------------|
//! | 1 | Publishing never blocks on consumers | bounded broadcast ring |
//! | 2 | Replay subscribers see each envelope once | snapshot and receiver under one lock |
//! | 3 | A stream completes exactly once | sender taken on close |
//! | 4 | Completion waits for the last producer | producer count in `State` |
//! | 5 | One bad document never ends a stream | per-item errors in `forward` |
//!
//! ```text
//!  producers ──► ProducerHandle ──► DocumentBroker ──► live consumers
//!                                        │
//!                                        └── replay buffer ──► replay consumers
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod broker;
pub mod config;
pub mod errors;
pub mod producer;
pub mod registry;

pub use broker::{DocumentBroker, DocumentStream};
pub use config::BrokerConfig;
pub use errors::{BrokerError, ProduceError};
pub use producer::{ForwardReport, ProducerHandle};
pub use registry::{DocumentBrokerRegistry, SubscriptionMode};
