//! # Simulation Connector
//!
//! A region connector without an upstream system. Requests are recorded,
//! optionally accepted on the spot, and readings are whatever the caller
//! pushes through [`SimulationConnector::emit_reading`]. Used by the demo
//! binary and the integration tests.

use async_trait::async_trait;
use cg_01_permission_projection::PermissionRequestRepository;
use cg_06_retransmission::RetransmissionValidation;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use shared_types::{
    AdapterError, AdapterStatusUpdate, DataNeedRule, DataNeedRuleSet, DocumentKind, EnergyType,
    Granularity, Period, PermissionId, PermissionRequest, PermissionStatus, RawReading,
    RegionConnector, RegionConnectorId, RegionConnectorMetadata, RegionConnectorRetransmissionService,
    RetransmissionRequest, RetransmissionResult,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 256;

pub struct SimulationConnector {
    id: RegionConnectorId,
    country_code: String,
    auto_accept: bool,
    unreachable: AtomicBool,
    /// `None` once the reading feed was finished.
    readings: Mutex<Option<broadcast::Sender<RawReading>>>,
    updates: broadcast::Sender<AdapterStatusUpdate>,
    sent: Mutex<HashSet<PermissionId>>,
    revoked: Mutex<HashSet<PermissionId>>,
}

impl SimulationConnector {
    #[must_use]
    pub fn new(id: RegionConnectorId, country_code: impl Into<String>) -> Self {
        let (readings, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (updates, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            id,
            country_code: country_code.into(),
            auto_accept: false,
            unreachable: AtomicBool::new(false),
            readings: Mutex::new(Some(readings)),
            updates,
            sent: Mutex::new(HashSet::new()),
            revoked: Mutex::new(HashSet::new()),
        }
    }

    /// Report `Accepted` for every request right after it was sent.
    #[must_use]
    pub fn with_auto_accept(mut self, auto_accept: bool) -> Self {
        self.auto_accept = auto_accept;
        self
    }

    /// Make every following `create_permission` fail.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Push a reading to every `readings()` stream. Returns the number of
    /// streams reached.
    pub fn emit_reading(&self, reading: RawReading) -> usize {
        self.readings
            .lock()
            .as_ref()
            .and_then(|sender| sender.send(reading).ok())
            .unwrap_or(0)
    }

    /// End every `readings()` stream.
    pub fn finish_readings(&self) {
        if self.readings.lock().take().is_some() {
            debug!(region_connector = %self.id, "Simulated reading feed finished");
        }
    }

    /// Report a status change as the administrator would.
    pub fn report_status(&self, update: AdapterStatusUpdate) {
        // No listener yet is fine
        let _ = self.updates.send(update);
    }

    #[must_use]
    pub fn was_sent(&self, permission_id: &PermissionId) -> bool {
        self.sent.lock().contains(permission_id)
    }

    #[must_use]
    pub fn was_revoked(&self, permission_id: &PermissionId) -> bool {
        self.revoked.lock().contains(permission_id)
    }
}

#[async_trait]
impl RegionConnector for SimulationConnector {
    fn metadata(&self) -> RegionConnectorMetadata {
        RegionConnectorMetadata {
            id: self.id.clone(),
            country_code: self.country_code.clone(),
            earliest_start: Period::months(-36),
            latest_end: Period::months(36),
        }
    }

    fn rule_set(&self) -> DataNeedRuleSet {
        DataNeedRuleSet::new(vec![
            DataNeedRule::ValidatedHistoricalData {
                energy_type: EnergyType::Electricity,
                granularities: vec![Granularity::PT15M, Granularity::PT1H, Granularity::P1D],
            },
            DataNeedRule::AccountingPoint,
            DataNeedRule::AllowMultipleDataNeeds,
        ])
    }

    async fn create_permission(&self, request: &PermissionRequest) -> Result<(), AdapterError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AdapterError::Unavailable(format!(
                "Simulated administrator for {} unreachable",
                self.id
            )));
        }
        self.sent.lock().insert(request.permission_id.clone());
        if self.auto_accept {
            self.report_status(AdapterStatusUpdate::new(
                request.permission_id.clone(),
                PermissionStatus::Accepted,
            ));
        }
        Ok(())
    }

    async fn revoke(&self, permission_id: &PermissionId) -> Result<(), AdapterError> {
        if !self.was_sent(permission_id) {
            return Err(AdapterError::UnknownPermission(permission_id.to_string()));
        }
        self.revoked.lock().insert(permission_id.clone());
        Ok(())
    }

    fn readings(&self) -> BoxStream<'static, Result<RawReading, AdapterError>> {
        let Some(receiver) = self.readings.lock().as_ref().map(broadcast::Sender::subscribe) else {
            return stream::empty().boxed();
        };
        BroadcastStream::new(receiver)
            .map(|item| {
                item.map_err(|e| AdapterError::Unavailable(format!("Simulated feed: {e}")))
            })
            .boxed()
    }

    fn status_updates(&self) -> BoxStream<'static, AdapterStatusUpdate> {
        let id = self.id.clone();
        BroadcastStream::new(self.updates.subscribe())
            .filter_map(move |item| {
                let id = id.clone();
                async move {
                    match item {
                        Ok(update) => Some(update),
                        Err(e) => {
                            warn!(region_connector = %id, error = %e, "Status updates lost");
                            None
                        }
                    }
                }
            })
            .boxed()
    }
}

/// Validates like every connector must, then replays the window as one
/// reading.
pub struct SimulationRetransmissionService {
    connector: Arc<SimulationConnector>,
    requests: Arc<dyn PermissionRequestRepository>,
    validation: RetransmissionValidation,
}

impl SimulationRetransmissionService {
    #[must_use]
    pub fn new(
        connector: Arc<SimulationConnector>,
        requests: Arc<dyn PermissionRequestRepository>,
        validation: RetransmissionValidation,
    ) -> Self {
        Self {
            connector,
            requests,
            validation,
        }
    }
}

#[async_trait]
impl RegionConnectorRetransmissionService for SimulationRetransmissionService {
    async fn request_retransmission(
        &self,
        request: &RetransmissionRequest,
    ) -> Result<RetransmissionResult, AdapterError> {
        let permission = self.requests.get(&request.permission_id);
        if let Err(rejected) = self.validation.validate(permission.as_ref(), request) {
            return Ok(rejected);
        }
        let Some(permission) = permission else {
            return Err(AdapterError::UnknownPermission(request.permission_id.to_string()));
        };

        let reading = RawReading {
            permission_id: permission.permission_id.clone(),
            connection_id: permission.connection_id.clone(),
            data_need_id: permission.data_need_id.clone(),
            kind: DocumentKind::ValidatedHistoricalData,
            received: Utc::now(),
            payload: serde_json::json!({
                "retransmission": { "from": request.from, "to": request.to }
            }),
        };
        let timestamp = Utc::now();
        if self.connector.emit_reading(reading) == 0 {
            return Ok(RetransmissionResult::DataNotAvailable {
                permission_id: permission.permission_id,
                timestamp,
            });
        }
        Ok(RetransmissionResult::Success {
            permission_id: permission.permission_id,
            timestamp,
        })
    }
}
