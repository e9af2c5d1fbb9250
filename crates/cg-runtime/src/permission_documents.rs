//! # Permission Market Documents
//!
//! Every externally visible permission event is also published as a
//! permission market document on the configured
//! `permission_market_document` stream. The producer holds its registration
//! for as long as it follows the bus, so the stream completes on shutdown.

use cg_01_permission_projection::{ConnectionStatusMessage, HistoryError, PermissionEventHistory};
use cg_05_document_broker::{DocumentBrokerRegistry, ProducerHandle};
use cg_telemetry::PRODUCER_ERRORS;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared_bus::Subscription;
use shared_types::{
    DocumentKind, DocumentStreamKey, EnvelopeHeader, MarketDocumentEnvelope, PermissionEvent,
    PermissionId, PermissionRequest, PermissionStatus, Timeframe,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const PROCESS_TYPE: &str = "access_to_metered_data";

#[derive(Debug, Error)]
pub enum PermissionDocumentError {
    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("Failed to encode permission document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Body of a permission market document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionDocument {
    #[serde(rename = "mRID")]
    pub mrid: PermissionId,
    pub created_date_time: DateTime<Utc>,
    pub process_type: &'static str,
    pub permission_administrator: String,
    pub metered_data_administrator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Timeframe>,
    pub permission: PermissionRecord,
}

/// The status change a document announces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionRecord {
    pub created_date_time: DateTime<Utc>,
    pub status: PermissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_information: Option<serde_json::Value>,
}

pub struct PermissionDocumentProducer {
    key: DocumentStreamKey,
    history: Arc<dyn PermissionEventHistory>,
}

impl PermissionDocumentProducer {
    /// Producer for the first configured permission market document stream.
    #[must_use]
    pub fn for_streams(
        streams: &[DocumentStreamKey],
        history: Arc<dyn PermissionEventHistory>,
    ) -> Option<Self> {
        let key = streams
            .iter()
            .find(|key| key.kind == DocumentKind::PermissionMarketDocument)?;
        Some(Self {
            key: key.clone(),
            history,
        })
    }

    #[must_use]
    pub fn key(&self) -> &DocumentStreamKey {
        &self.key
    }

    /// The document announcing `event`.
    ///
    /// `Ok(None)` for internal events and for permissions whose history has
    /// no `Created` event.
    ///
    /// # Errors
    ///
    /// The history could not be read or the body could not be encoded.
    pub fn document(
        &self,
        event: &PermissionEvent,
    ) -> Result<Option<MarketDocumentEnvelope>, PermissionDocumentError> {
        if !event.is_external() {
            return Ok(None);
        }
        let events = self.history.history(&event.permission_id)?;
        let Some(request) = PermissionRequest::replay(&events) else {
            warn!(permission_id = %event.permission_id, "No Created event in history, document skipped");
            return Ok(None);
        };

        let status = ConnectionStatusMessage::from_event(&request, event);
        let body = PermissionDocument {
            mrid: request.permission_id.clone(),
            created_date_time: event.event_created,
            process_type: PROCESS_TYPE,
            permission_administrator: request.data_source.permission_administrator_id.clone(),
            metered_data_administrator: request.data_source.metered_data_administrator_id.clone(),
            period: request.validity,
            permission: PermissionRecord {
                created_date_time: request.created,
                status: status.status,
                reason: status.message,
                additional_information: status.additional_information,
            },
        };

        Ok(Some(MarketDocumentEnvelope {
            header: EnvelopeHeader {
                connection_id: request.connection_id,
                permission_id: request.permission_id,
                data_need_id: request.data_need_id,
                region_connector_id: request.data_source.region_connector_id,
                country: request.data_source.country_code,
                created: event.event_created,
                kind: self.key.kind,
                version: self.key.version.clone(),
            },
            payload: serde_json::to_value(body)?,
        }))
    }

    /// Follow `subscription` until shutdown, publishing one document per
    /// external event.
    ///
    /// Returns `None` if the stream is already closed.
    pub fn spawn(
        self,
        subscription: Subscription,
        brokers: &DocumentBrokerRegistry,
        shutdown: watch::Receiver<bool>,
    ) -> Option<JoinHandle<()>> {
        let producer = match brokers.register_producer(&self.key) {
            Ok(producer) => producer,
            Err(e) => {
                warn!(stream = %self.key, error = %e, "Permission document producer not registered");
                return None;
            }
        };
        info!(stream = %self.key, "Permission document producer started");
        Some(tokio::spawn(self.run(subscription, producer, shutdown)))
    }

    async fn run(
        self,
        mut subscription: Subscription,
        producer: ProducerHandle,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                event = subscription.recv() => {
                    let Some(event) = event else { break };
                    self.publish(&producer, &event);
                }
            }
        }
        producer.complete();
        debug!(stream = %self.key, "Permission document producer stopped");
    }

    fn publish(&self, producer: &ProducerHandle, event: &PermissionEvent) {
        let published = match self.document(event) {
            Ok(Some(envelope)) => producer.publish(envelope).map(|_| ()).map_err(|e| e.to_string()),
            Ok(None) => Ok(()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(message) = published {
            PRODUCER_ERRORS.with_label_values(&[self.key.to_string().as_str()]).inc();
            warn!(
                stream = %self.key,
                permission_id = %event.permission_id,
                error = %message,
                "Permission document dropped"
            );
        }
    }
}
