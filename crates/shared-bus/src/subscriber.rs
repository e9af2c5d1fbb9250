//! # Subscriptions
//!
//! A [`Subscription`] owns one broadcast receiver plus its filter. Events the
//! filter rejects are skipped on the receiving side. When the ring overruns a
//! slow subscription it reports the number of lost events, counts them and
//! carries on with the oldest event still buffered.

use crate::events::EventFilter;
use futures::stream::{self, BoxStream};
use shared_types::PermissionEvent;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::Stream;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

/// Dropping it unsubscribes. Nothing else on the bus notices.
pub struct Subscription {
    receiver: broadcast::Receiver<PermissionEvent>,
    filter: EventFilter,
    lagged: Arc<AtomicU64>,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<PermissionEvent>,
        filter: EventFilter,
        lagged: Arc<AtomicU64>,
    ) -> Self {
        Self {
            receiver,
            filter,
            lagged,
        }
    }

    fn overrun(&self, lost: u64) {
        self.lagged.fetch_add(lost, Ordering::Relaxed);
        cg_telemetry::BUS_EVENTS_LAGGED.inc_by(lost);
        warn!(lost, filter = ?self.filter, "Subscription overrun, oldest events lost");
    }

    /// Wait for the next event passing the filter. `None` once the bus is
    /// gone.
    pub async fn recv(&mut self) -> Option<PermissionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(lost)) => self.overrun(lost),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Self::recv`]: `Ok(None)` when nothing that
    /// passes the filter is buffered.
    ///
    /// # Errors
    ///
    /// `SubscriptionError::Closed` once the bus is gone.
    pub fn try_recv(&mut self) -> Result<Option<PermissionEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(lost)) => self.overrun(lost),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(filter = ?self.filter, "Bus subscription closed");
    }
}

/// A [`Subscription`] driven as a `Stream`; ends when the bus is dropped.
pub struct EventStream {
    filter: EventFilter,
    inner: BoxStream<'static, PermissionEvent>,
}

impl EventStream {
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        let filter = subscription.filter().clone();
        let inner = stream::unfold(subscription, |mut subscription| async move {
            let event = subscription.recv().await?;
            Some((event, subscription))
        });
        Self {
            filter,
            inner: Box::pin(inner),
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = PermissionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::{EventPublisher, InMemoryEventBus};
    use chrono::Utc;
    use shared_types::{PermissionId, PermissionStatus};
    use std::time::Duration;
    use tokio_stream::StreamExt;

    const WAIT: Duration = Duration::from_millis(100);

    fn event(id: &str, status: PermissionStatus) -> PermissionEvent {
        PermissionEvent::new(PermissionId::new(id), status, Utc::now())
    }

    #[tokio::test]
    async fn test_rejected_events_are_skipped() {
        let bus = InMemoryEventBus::new();
        let mut accepted = bus.subscribe(EventFilter::statuses(vec![PermissionStatus::Accepted]));

        bus.publish(event("p1", PermissionStatus::Validated)).await;
        bus.publish(event("p1", PermissionStatus::Accepted)).await;

        let next = tokio::time::timeout(WAIT, accepted.recv()).await.unwrap().unwrap();
        assert_eq!(next.status, PermissionStatus::Accepted);
        assert!(matches!(accepted.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_dropping_subscriptions_detaches_them() {
        let bus = InMemoryEventBus::new();
        let first = bus.subscribe(EventFilter::all());
        let second = bus.subscribe(EventFilter::all());
        drop(first);
        assert_eq!(bus.subscriber_count(), 1);
        drop(second);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_overrun_keeps_newest_events() {
        let bus = InMemoryEventBus::with_capacity(2);
        let mut slow = bus.subscribe(EventFilter::all());

        for i in 0..5 {
            bus.publish(event(&format!("p{i}"), PermissionStatus::Created)).await;
        }

        let kept: Vec<_> = std::iter::from_fn(|| slow.try_recv().unwrap())
            .map(|e| e.permission_id.to_string())
            .collect();
        assert_eq!(kept, vec!["p3", "p4"]);
        assert_eq!(bus.events_lagged(), 3);
    }

    #[tokio::test]
    async fn test_stream_by_permission() {
        let bus = InMemoryEventBus::new();
        let mut only_p2 = bus.event_stream(EventFilter::permissions(vec![PermissionId::new("p2")]));

        bus.publish(event("p1", PermissionStatus::Created)).await;
        bus.publish(event("p2", PermissionStatus::Created)).await;

        let next = tokio::time::timeout(WAIT, only_p2.next()).await.unwrap().unwrap();
        assert_eq!(next.permission_id, PermissionId::new("p2"));
        assert_eq!(EventStream::filter(&only_p2).permission_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_stream_ends_with_bus() {
        let bus = InMemoryEventBus::new();
        let mut everything = bus.event_stream(EventFilter::all());
        let mut polled = bus.subscribe(EventFilter::all());
        drop(bus);

        assert!(everything.next().await.is_none());
        assert!(matches!(polled.try_recv(), Err(SubscriptionError::Closed)));
    }
}
