//! # Document Broker
//!
//! One broker per `(DocumentKind, SchemaVersion)`. Producers publish
//! envelopes; consumers subscribe live or with replay.
//!
//! ## Overflow policy
//!
//! Live delivery uses a bounded `tokio::sync::broadcast` ring. Publishing
//! never blocks; a consumer that falls behind loses the oldest envelopes and
//! the loss is logged and counted per stream.
//!
//! ## Replay
//!
//! The broker keeps the envelopes of the trailing `replay_window`, capped at
//! `replay_capacity`. The snapshot handed to a replay subscriber and its live
//! receiver are taken under the same lock as `publish`, so nothing is seen
//! twice and nothing falls between them.
//!
//! ## Completion
//!
//! `close` drops the only sender. Every current receiver drains what is
//! buffered and then ends; later subscribers get their replay snapshot and
//! end right after. Closing twice is a no-op.

use crate::config::BrokerConfig;
use crate::errors::BrokerError;
use cg_telemetry::{CONSUMER_LAGGED, DOCUMENTS_PUBLISHED};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use shared_types::{DocumentStreamKey, MarketDocumentEnvelope};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Stream of envelopes for one consumer. Ends once the broker is closed.
pub type DocumentStream = BoxStream<'static, Arc<MarketDocumentEnvelope>>;

struct State {
    sender: Option<broadcast::Sender<Arc<MarketDocumentEnvelope>>>,
    replay: VecDeque<(Instant, Arc<MarketDocumentEnvelope>)>,
    producers: usize,
}

impl State {
    fn prune(&mut self, window: Duration, capacity: usize) {
        if let Some(cutoff) = Instant::now().checked_sub(window) {
            while self.replay.front().is_some_and(|(at, _)| *at < cutoff) {
                self.replay.pop_front();
            }
        }
        while self.replay.len() > capacity {
            self.replay.pop_front();
        }
    }
}

pub struct DocumentBroker {
    key: DocumentStreamKey,
    label: String,
    replay_window: Duration,
    replay_capacity: usize,
    state: Mutex<State>,
}

impl DocumentBroker {
    #[must_use]
    pub fn new(key: DocumentStreamKey, config: &BrokerConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            label: key.to_string(),
            key,
            replay_window: config.replay_window(),
            replay_capacity: config.replay_capacity,
            state: Mutex::new(State {
                sender: Some(sender),
                replay: VecDeque::new(),
                producers: 0,
            }),
        }
    }

    #[must_use]
    pub fn key(&self) -> &DocumentStreamKey {
        &self.key
    }

    /// Publish one envelope. Returns the number of live receivers.
    ///
    /// # Errors
    ///
    /// - `BrokerError::Closed` after [`Self::close`]
    /// - `BrokerError::WrongStream` if the envelope belongs to another key
    pub fn publish(&self, envelope: MarketDocumentEnvelope) -> Result<usize, BrokerError> {
        let actual = envelope.stream_key();
        if actual != self.key {
            return Err(BrokerError::WrongStream {
                expected: self.key.clone(),
                actual,
            });
        }

        let envelope = Arc::new(envelope);
        let mut state = self.state.lock();
        let Some(sender) = state.sender.clone() else {
            return Err(BrokerError::Closed {
                key: self.key.clone(),
            });
        };

        state.replay.push_back((Instant::now(), envelope.clone()));
        state.prune(self.replay_window, self.replay_capacity);
        // No live receivers is fine
        let receivers = sender.send(envelope).unwrap_or(0);
        drop(state);

        DOCUMENTS_PUBLISHED.with_label_values(&[self.label.as_str()]).inc();
        debug!(stream = %self.label, receivers, "Document published");
        Ok(receivers)
    }

    /// Envelopes published from now on.
    #[must_use]
    pub fn subscribe_live(&self) -> DocumentStream {
        let state = self.state.lock();
        let receiver = state.sender.as_ref().map(broadcast::Sender::subscribe);
        drop(state);
        consumer_stream(self.label.clone(), VecDeque::new(), receiver)
    }

    /// Envelopes of the trailing replay window, then everything published
    /// from now on.
    #[must_use]
    pub fn subscribe_replay(&self) -> DocumentStream {
        let mut state = self.state.lock();
        state.prune(self.replay_window, self.replay_capacity);
        let backlog: VecDeque<_> = state.replay.iter().map(|(_, e)| e.clone()).collect();
        let receiver = state.sender.as_ref().map(broadcast::Sender::subscribe);
        drop(state);
        consumer_stream(self.label.clone(), backlog, receiver)
    }

    /// Complete the stream for every current and future subscriber.
    ///
    /// Returns `false` if the broker was already closed.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        let closed = state.sender.take().is_some();
        drop(state);
        if closed {
            info!(stream = %self.label, "Document stream closed");
        }
        closed
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().sender.is_none()
    }

    /// Live subscribers currently attached.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .sender
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    pub(crate) fn add_producer(&self) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        if state.sender.is_none() {
            return Err(BrokerError::Closed {
                key: self.key.clone(),
            });
        }
        state.producers += 1;
        Ok(())
    }

    /// Returns `true` if this was the last registered producer.
    pub(crate) fn remove_producer(&self) -> bool {
        let mut state = self.state.lock();
        state.producers = state.producers.saturating_sub(1);
        state.producers == 0
    }

    #[must_use]
    pub fn producer_count(&self) -> usize {
        self.state.lock().producers
    }
}

fn consumer_stream(
    label: String,
    backlog: VecDeque<Arc<MarketDocumentEnvelope>>,
    receiver: Option<broadcast::Receiver<Arc<MarketDocumentEnvelope>>>,
) -> DocumentStream {
    stream::unfold(
        (label, backlog, receiver),
        |(label, mut backlog, mut receiver)| async move {
            if let Some(envelope) = backlog.pop_front() {
                return Some((envelope, (label, backlog, receiver)));
            }
            loop {
                let rx = receiver.as_mut()?;
                match rx.recv().await {
                    Ok(envelope) => return Some((envelope, (label, backlog, receiver))),
                    Err(RecvError::Lagged(count)) => {
                        CONSUMER_LAGGED.with_label_values(&[label.as_str()]).inc_by(count);
                        warn!(stream = %label, lagged = count, "Document consumer lagged, oldest envelopes dropped");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        },
    )
    .fuse()
    .boxed()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::{
        ConnectionId, DataNeedId, DocumentKind, EnvelopeHeader, PermissionId, RegionConnectorId,
        SchemaVersion,
    };

    pub fn key() -> DocumentStreamKey {
        DocumentStreamKey::new(DocumentKind::ValidatedHistoricalData, SchemaVersion::new("1.04"))
    }

    pub fn envelope(n: u64) -> MarketDocumentEnvelope {
        MarketDocumentEnvelope {
            header: EnvelopeHeader {
                connection_id: ConnectionId::new("c1"),
                permission_id: PermissionId::new("p1"),
                data_need_id: DataNeedId::new("dn"),
                region_connector_id: RegionConnectorId::new("sim"),
                country: "AT".into(),
                created: Utc::now(),
                kind: DocumentKind::ValidatedHistoricalData,
                version: SchemaVersion::new("1.04"),
            },
            payload: serde_json::json!({ "n": n }),
        }
    }

    pub fn n(envelope: &MarketDocumentEnvelope) -> u64 {
        envelope.payload["n"].as_u64().unwrap()
    }

    fn broker(window_secs: u64, capacity: usize) -> DocumentBroker {
        DocumentBroker::new(
            key(),
            &BrokerConfig {
                replay_window_secs: window_secs,
                replay_capacity: capacity,
                channel_capacity: 16,
                streams: vec![],
            },
        )
    }

    #[tokio::test]
    async fn test_live_subscriber_sees_only_later_envelopes() {
        let broker = broker(10, 100);
        broker.publish(envelope(1)).unwrap();
        let live = broker.subscribe_live();
        broker.publish(envelope(2)).unwrap();
        broker.close();

        let received: Vec<u64> = live.map(|e| n(&e)).collect().await;
        assert_eq!(received, vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_window_excludes_old_envelopes() {
        let broker = broker(10, 100);
        broker.publish(envelope(1)).unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        broker.publish(envelope(2)).unwrap();
        broker.close();

        let received: Vec<u64> = broker.subscribe_replay().map(|e| n(&e)).collect().await;
        assert_eq!(received, vec![2]);
    }

    #[tokio::test]
    async fn test_replay_capacity_bounds_backlog() {
        let broker = broker(60, 2);
        for i in 1..=5 {
            broker.publish(envelope(i)).unwrap();
        }
        broker.close();

        let received: Vec<u64> = broker.subscribe_replay().map(|e| n(&e)).collect().await;
        assert_eq!(received, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_close_completes_every_subscriber_once() {
        let broker = broker(10, 100);
        let mut first = broker.subscribe_live();
        let mut second = broker.subscribe_replay();

        assert!(broker.close());
        assert!(!broker.close());
        assert!(broker.is_closed());

        assert!(first.next().await.is_none());
        assert!(first.next().await.is_none());
        assert!(second.next().await.is_none());
        assert!(broker.subscribe_live().next().await.is_none());
    }

    #[test]
    fn test_publish_after_close_fails() {
        let broker = broker(10, 100);
        broker.close();
        assert!(matches!(
            broker.publish(envelope(1)),
            Err(BrokerError::Closed { .. })
        ));
    }

    #[test]
    fn test_wrong_stream_is_rejected() {
        let broker = broker(10, 100);
        let mut other = envelope(1);
        other.header.version = SchemaVersion::new("0.82");
        assert!(matches!(
            broker.publish(other),
            Err(BrokerError::WrongStream { .. })
        ));
    }

    #[tokio::test]
    async fn test_slow_consumer_loses_oldest_and_publisher_never_blocks() {
        let broker = DocumentBroker::new(
            key(),
            &BrokerConfig {
                replay_window_secs: 0,
                replay_capacity: 0,
                channel_capacity: 2,
                streams: vec![],
            },
        );
        let slow = broker.subscribe_live();
        for i in 1..=5 {
            broker.publish(envelope(i)).unwrap();
        }
        broker.close();

        let received: Vec<u64> = slow.map(|e| n(&e)).collect().await;
        assert_eq!(received, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_dropping_a_consumer_does_not_affect_others() {
        let broker = broker(10, 100);
        let dropped = broker.subscribe_live();
        let kept = broker.subscribe_live();
        drop(dropped);

        broker.publish(envelope(1)).unwrap();
        broker.close();
        let received: Vec<u64> = kept.map(|e| n(&e)).collect().await;
        assert_eq!(received, vec![1]);
        assert_eq!(broker.subscriber_count(), 0);
    }
}
