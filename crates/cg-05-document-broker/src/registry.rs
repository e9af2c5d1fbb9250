//! # Broker Registry
//!
//! Holds one [`DocumentBroker`] per configured stream key and routes
//! envelopes and subscriptions to it.

use crate::broker::{DocumentBroker, DocumentStream};
use crate::config::BrokerConfig;
use crate::errors::BrokerError;
use crate::producer::ProducerHandle;
use serde::{Deserialize, Serialize};
use shared_types::{DocumentKind, DocumentStreamKey, MarketDocumentEnvelope, SchemaVersion};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionMode {
    /// Only envelopes published after subscribing.
    #[default]
    Live,
    /// The trailing replay window first, then live.
    Replay,
}

pub struct DocumentBrokerRegistry {
    brokers: HashMap<DocumentStreamKey, Arc<DocumentBroker>>,
}

impl DocumentBrokerRegistry {
    #[must_use]
    pub fn from_config(config: &BrokerConfig) -> Self {
        let brokers: HashMap<_, _> = config
            .streams
            .iter()
            .map(|key| (key.clone(), Arc::new(DocumentBroker::new(key.clone(), config))))
            .collect();
        info!(streams = brokers.len(), "Document brokers created");
        Self { brokers }
    }

    /// # Errors
    ///
    /// `BrokerError::UnknownStream` if no broker serves `key`.
    pub fn broker(&self, key: &DocumentStreamKey) -> Result<Arc<DocumentBroker>, BrokerError> {
        self.brokers
            .get(key)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownStream { key: key.clone() })
    }

    /// # Errors
    ///
    /// `BrokerError::UnknownStream` if the pair is not configured.
    pub fn subscribe(
        &self,
        kind: DocumentKind,
        version: SchemaVersion,
        mode: SubscriptionMode,
    ) -> Result<DocumentStream, BrokerError> {
        let broker = self.broker(&DocumentStreamKey::new(kind, version))?;
        Ok(match mode {
            SubscriptionMode::Live => broker.subscribe_live(),
            SubscriptionMode::Replay => broker.subscribe_replay(),
        })
    }

    /// Publish into the broker matching the envelope's header.
    ///
    /// # Errors
    ///
    /// - `BrokerError::UnknownStream` if the pair is not configured
    /// - `BrokerError::Closed` if that stream already completed
    pub fn publish(&self, envelope: MarketDocumentEnvelope) -> Result<usize, BrokerError> {
        self.broker(&envelope.stream_key())?.publish(envelope)
    }

    /// # Errors
    ///
    /// - `BrokerError::UnknownStream` if the pair is not configured
    /// - `BrokerError::Closed` if that stream already completed
    pub fn register_producer(&self, key: &DocumentStreamKey) -> Result<ProducerHandle, BrokerError> {
        self.broker(key)?.register_producer()
    }

    /// Complete every stream. Used on shutdown.
    pub fn close_all(&self) {
        for broker in self.brokers.values() {
            broker.close();
        }
    }

    #[must_use]
    pub fn keys(&self) -> Vec<DocumentStreamKey> {
        let mut keys: Vec<_> = self.brokers.keys().cloned().collect();
        keys.sort_by_key(ToString::to_string);
        keys
    }
}
