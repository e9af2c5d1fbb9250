//! # Event Publisher
//!
//! The outbox hands every committed event to an [`EventPublisher`]. The
//! in-memory bus fans it out over one bounded broadcast ring shared by all
//! subscriptions.

use crate::events::EventFilter;
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use shared_types::PermissionEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Sink for committed permission events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Returns how many subscriptions were live when the event went out.
    /// Never waits for slow subscribers.
    async fn publish(&self, event: PermissionEvent) -> usize;
}

/// Process-local bus over `tokio::sync::broadcast`.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<PermissionEvent>,
    /// Shared with every subscription so overruns are counted per bus.
    lagged: Arc<AtomicU64>,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus holding at most `capacity` undelivered events (minimum one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            lagged: Arc::new(AtomicU64::new(0)),
            capacity,
        }
    }

    /// Receive events published from now on that pass `filter`.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(filter = ?filter, "Bus subscription opened");
        Subscription::new(self.sender.subscribe(), filter, self.lagged.clone())
    }

    /// [`Self::subscribe`] as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events overwritten before some subscription could read them.
    #[must_use]
    pub fn events_lagged(&self) -> u64 {
        self.lagged.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: PermissionEvent) -> usize {
        cg_telemetry::BUS_EVENTS_PUBLISHED.inc();
        let permission_id = event.permission_id.clone();
        let status = event.status;

        // `send` only fails when nobody is listening
        let delivered = self.sender.send(event).unwrap_or(0);
        if delivered == 0 {
            trace!(permission_id = %permission_id, status = %status, "No subscription for event");
        } else {
            debug!(
                permission_id = %permission_id,
                status = %status,
                subscriptions = delivered,
                "Event fanned out"
            );
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::{PermissionId, PermissionStatus};

    fn created(id: &str) -> PermissionEvent {
        PermissionEvent::new(PermissionId::new(id), PermissionStatus::Created, Utc::now())
    }

    #[tokio::test]
    async fn test_publishing_into_empty_bus_is_fine() {
        let bus = InMemoryEventBus::new();
        assert_eq!(bus.publish(created("p1")).await, 0);
    }

    #[tokio::test]
    async fn test_filters_do_not_change_fan_out_count() {
        let bus = InMemoryEventBus::new();
        let _everything = bus.subscribe(EventFilter::all());
        let _external = bus.subscribe(EventFilter::external());
        let _accepted = bus.subscribe(EventFilter::statuses(vec![PermissionStatus::Accepted]));

        assert_eq!(bus.subscriber_count(), 3);
        assert_eq!(bus.publish(created("p1")).await, 3);
    }

    #[test]
    fn test_capacity_is_at_least_one() {
        assert_eq!(InMemoryEventBus::with_capacity(0).capacity(), 1);
        assert_eq!(InMemoryEventBus::with_capacity(64).capacity(), 64);

        let bus = InMemoryEventBus::default();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.events_lagged(), 0);
    }
}
