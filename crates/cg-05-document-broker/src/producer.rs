//! # Producers
//!
//! A broker completes once its last registered producer completes. A
//! [`ProducerHandle`] is that registration; dropping it counts as completion.

use crate::broker::DocumentBroker;
use crate::errors::{BrokerError, ProduceError};
use cg_telemetry::PRODUCER_ERRORS;
use futures::{pin_mut, Stream, StreamExt};
use shared_types::MarketDocumentEnvelope;
use std::sync::Arc;
use tracing::{debug, warn};

/// What [`ProducerHandle::forward`] did with its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardReport {
    pub published: usize,
    pub failed: usize,
}

impl DocumentBroker {
    /// Register a producer. The broker stays open until every registered
    /// producer has completed.
    ///
    /// # Errors
    ///
    /// `BrokerError::Closed` if the broker already completed.
    pub fn register_producer(self: &Arc<Self>) -> Result<ProducerHandle, BrokerError> {
        self.add_producer()?;
        Ok(ProducerHandle {
            broker: Arc::clone(self),
            done: false,
        })
    }
}

pub struct ProducerHandle {
    broker: Arc<DocumentBroker>,
    done: bool,
}

impl ProducerHandle {
    #[must_use]
    pub fn broker(&self) -> &Arc<DocumentBroker> {
        &self.broker
    }

    /// # Errors
    ///
    /// See [`DocumentBroker::publish`].
    pub fn publish(&self, envelope: MarketDocumentEnvelope) -> Result<usize, BrokerError> {
        self.broker.publish(envelope)
    }

    /// Publish everything `documents` yields, then complete.
    ///
    /// A failed item is logged and skipped; the stream keeps going. Only a
    /// closed broker stops forwarding early.
    pub async fn forward<S>(self, documents: S) -> ForwardReport
    where
        S: Stream<Item = Result<MarketDocumentEnvelope, ProduceError>>,
    {
        let mut report = ForwardReport::default();
        let label = self.broker.key().to_string();
        pin_mut!(documents);

        while let Some(item) = documents.next().await {
            let published = item
                .map_err(|e| e.to_string())
                .and_then(|envelope| self.publish(envelope).map_err(|e| e.to_string()));
            match published {
                Ok(_) => report.published += 1,
                Err(message) => {
                    report.failed += 1;
                    PRODUCER_ERRORS.with_label_values(&[label.as_str()]).inc();
                    warn!(stream = %label, error = %message, "Dropped document from producer");
                    if self.broker.is_closed() {
                        break;
                    }
                }
            }
        }

        debug!(
            stream = %label,
            published = report.published,
            failed = report.failed,
            "Producer finished"
        );
        self.complete();
        report
    }

    /// Mark this producer done. Closes the broker if it was the last one.
    pub fn complete(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if self.broker.remove_producer() {
            self.broker.close();
        }
    }
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        self.finish();
    }
}
