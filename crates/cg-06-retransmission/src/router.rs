//! # Retransmission Router
//!
//! Hands a retransmission request to the connector that owns the permission.
//! Every call ends in a [`RetransmissionResult`]: adapter errors, panics and
//! timeouts become `Failure`, and an unknown connector becomes
//! `RetransmissionServiceNotFound` without contacting anything.

use crate::config::RetransmissionConfig;
use cg_telemetry::RETRANSMISSIONS;
use parking_lot::RwLock;
use shared_types::{
    Clock, RegionConnectorId, RegionConnectorRetransmissionService, RetransmissionRequest,
    RetransmissionResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct RetransmissionRouter {
    services: RwLock<HashMap<RegionConnectorId, Arc<dyn RegionConnectorRetransmissionService>>>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl RetransmissionRouter {
    #[must_use]
    pub fn new(config: &RetransmissionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            timeout: config.timeout(),
            clock,
        }
    }

    /// Register the service of one connector. Replaces an earlier
    /// registration under the same id.
    pub fn register(
        &self,
        region_connector_id: RegionConnectorId,
        service: Arc<dyn RegionConnectorRetransmissionService>,
    ) {
        info!(region_connector = %region_connector_id, "Retransmission service registered");
        self.services.write().insert(region_connector_id, service);
    }

    #[must_use]
    pub fn is_registered(&self, region_connector_id: &RegionConnectorId) -> bool {
        self.services.read().contains_key(region_connector_id)
    }

    pub async fn route(
        &self,
        region_connector_id: &RegionConnectorId,
        request: RetransmissionRequest,
    ) -> RetransmissionResult {
        let service = self.services.read().get(region_connector_id).cloned();
        let result = match service {
            None => RetransmissionResult::RetransmissionServiceNotFound {
                permission_id: request.permission_id,
                region_connector_id: region_connector_id.clone(),
                timestamp: self.clock.now(),
            },
            Some(service) => self.call(service, request).await,
        };

        RETRANSMISSIONS
            .with_label_values(&[region_connector_id.as_str(), result.outcome().as_str()])
            .inc();
        debug!(
            region_connector = %region_connector_id,
            permission_id = %result.permission_id(),
            outcome = result.outcome().as_str(),
            "Retransmission routed"
        );
        result
    }

    async fn call(
        &self,
        service: Arc<dyn RegionConnectorRetransmissionService>,
        request: RetransmissionRequest,
    ) -> RetransmissionResult {
        let permission_id = request.permission_id.clone();
        let mut task =
            tokio::spawn(async move { service.request_retransmission(&request).await });

        let reason = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(result))) => return result,
            Ok(Ok(Err(e))) => e.to_string(),
            Ok(Err(join)) if join.is_panic() => "Retransmission service panicked".to_string(),
            Ok(Err(join)) => join.to_string(),
            Err(_) => {
                task.abort();
                format!("Retransmission service timed out after {:?}", self.timeout)
            }
        };

        warn!(permission_id = %permission_id, reason = %reason, "Retransmission failed");
        RetransmissionResult::Failure {
            permission_id,
            timestamp: self.clock.now(),
            reason,
        }
    }
}
