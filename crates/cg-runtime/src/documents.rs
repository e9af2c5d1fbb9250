//! # Document Pipeline
//!
//! Turns a connector's raw readings into market document envelopes and
//! feeds them to the brokers. Each connector registers one producer per
//! configured stream; a stream completes once every connector feeding it
//! has finished.

use cg_01_permission_projection::PermissionRequestRepository;
use cg_05_document_broker::{DocumentBrokerRegistry, ProduceError};
use cg_telemetry::PRODUCER_ERRORS;
use futures::stream::BoxStream;
use futures::StreamExt;
use shared_types::{
    AdapterError, DocumentKind, DocumentStreamKey, EnvelopeHeader, MarketDocumentEnvelope,
    RawReading, RegionConnectorId, RegionConnectorMetadata, SchemaVersion,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

const PIPELINE_BUFFER: usize = 256;

type Produced = Result<MarketDocumentEnvelope, ProduceError>;

/// Normalization of one connector's readings.
pub struct DocumentPipeline {
    metadata: RegionConnectorMetadata,
    /// Version emitted per kind: the first configured stream of that kind.
    versions: HashMap<DocumentKind, SchemaVersion>,
    requests: Arc<dyn PermissionRequestRepository>,
}

impl DocumentPipeline {
    #[must_use]
    pub fn new(
        metadata: RegionConnectorMetadata,
        streams: &[DocumentStreamKey],
        requests: Arc<dyn PermissionRequestRepository>,
    ) -> Self {
        let mut versions = HashMap::new();
        for key in streams {
            versions.entry(key.kind).or_insert_with(|| key.version.clone());
        }
        Self {
            metadata,
            versions,
            requests,
        }
    }

    #[must_use]
    pub fn region_connector_id(&self) -> &RegionConnectorId {
        &self.metadata.id
    }

    /// Stream a reading of `kind` ends up in, if any.
    #[must_use]
    pub fn stream_for(&self, kind: DocumentKind) -> Option<DocumentStreamKey> {
        self.versions
            .get(&kind)
            .map(|version| DocumentStreamKey::new(kind, version.clone()))
    }

    /// Wrap a reading into an envelope.
    ///
    /// # Errors
    ///
    /// `ProduceError` if the payload is not a JSON object, the permission is
    /// unknown or owned by another connector, or no stream carries the
    /// reading's kind.
    pub fn normalize(&self, reading: RawReading) -> Result<MarketDocumentEnvelope, ProduceError> {
        let Some(key) = self.stream_for(reading.kind) else {
            return Err(ProduceError::new(format!("No stream configured for {}", reading.kind)));
        };
        if !reading.payload.is_object() {
            return Err(ProduceError::new(format!(
                "Payload of {} reading for {} is not an object",
                reading.kind, reading.permission_id
            )));
        }
        let Some(permission) = self.requests.get(&reading.permission_id) else {
            return Err(ProduceError::new(format!("Unknown permission {}", reading.permission_id)));
        };
        if permission.data_source.region_connector_id != self.metadata.id {
            return Err(ProduceError::new(format!(
                "Permission {} does not belong to {}",
                reading.permission_id, self.metadata.id
            )));
        }

        Ok(MarketDocumentEnvelope {
            header: EnvelopeHeader {
                connection_id: reading.connection_id,
                permission_id: reading.permission_id,
                data_need_id: reading.data_need_id,
                region_connector_id: self.metadata.id.clone(),
                country: self.metadata.country_code.clone(),
                created: reading.received,
                kind: key.kind,
                version: key.version,
            },
            payload: reading.payload,
        })
    }

    /// Start feeding `readings` into the brokers.
    ///
    /// Registers the producers immediately, so a stream stays open at least
    /// until this pipeline finishes. The pipeline finishes when the readings
    /// end or shutdown is signalled.
    pub fn spawn(
        self,
        readings: BoxStream<'static, Result<RawReading, AdapterError>>,
        brokers: &DocumentBrokerRegistry,
        mut shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        let mut senders: HashMap<DocumentKind, mpsc::Sender<Produced>> = HashMap::new();

        for (kind, version) in &self.versions {
            let key = DocumentStreamKey::new(*kind, version.clone());
            let producer = match brokers.register_producer(&key) {
                Ok(producer) => producer,
                Err(e) => {
                    warn!(region_connector = %self.metadata.id, stream = %key, error = %e, "Producer not registered");
                    continue;
                }
            };
            let (tx, rx) = mpsc::channel(PIPELINE_BUFFER);
            senders.insert(*kind, tx);
            handles.push(tokio::spawn(async move {
                producer.forward(ReceiverStream::new(rx)).await;
            }));
        }

        let id = self.metadata.id.clone();
        info!(region_connector = %id, streams = senders.len(), "Document pipeline started");
        handles.push(tokio::spawn(async move {
            let mut readings = readings;
            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        debug!(region_connector = %id, "Document pipeline stopping");
                        break;
                    }
                    item = readings.next() => {
                        let Some(item) = item else {
                            debug!(region_connector = %id, "Readings ended");
                            break;
                        };
                        self.route(item, &senders).await;
                    }
                }
            }
            // Dropping the senders completes this pipeline's producers
        }));
        handles
    }

    async fn route(
        &self,
        item: Result<RawReading, AdapterError>,
        senders: &HashMap<DocumentKind, mpsc::Sender<Produced>>,
    ) {
        let reading = match item {
            Ok(reading) => reading,
            Err(e) => {
                warn!(region_connector = %self.metadata.id, error = %e, "Connector reading failed");
                return;
            }
        };
        let kind = reading.kind;
        let Some(sender) = senders.get(&kind) else {
            PRODUCER_ERRORS.with_label_values(&[kind.to_string().as_str()]).inc();
            warn!(region_connector = %self.metadata.id, kind = %kind, "No stream for reading");
            return;
        };
        if sender.send(self.normalize(reading)).await.is_err() {
            warn!(region_connector = %self.metadata.id, kind = %kind, "Producer gone");
        }
    }
}
