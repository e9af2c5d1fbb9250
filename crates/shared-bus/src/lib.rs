//! # Shared Bus - Event Bus for Committed Permission Events
//!
//! Every event committed by the event store is published here exactly once.
//! Extensions (persistence, notifications, ...) subscribe with a filter.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │    Outbox    │                    │  Extension   │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Overflow Policy
//!
//! The bus is a bounded ring (`tokio::sync::broadcast`). Publishing never
//! blocks. A subscriber that falls more than `capacity` events behind loses
//! the oldest ones; the loss is logged and counted, and the subscriber keeps
//! receiving from the oldest event still buffered.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::EventFilter;
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Default ring capacity (events buffered per bus).
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
