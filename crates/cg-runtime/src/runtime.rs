//! # Consent-Grid Runtime
//!
//! Owns every component and the tasks that connect them.
//!
//! ## Startup Sequence
//!
//! 1. Open the ledger (memory or file backed)
//! 2. Register region connectors and their retransmission services
//! 3. Rebuild the permission read model from the ledger
//! 4. Spawn the projection extensions against the bus
//! 5. Spawn the reclaimer, status-update loops and document pipelines
//! 6. Spawn the permission market document producer
//!
//! ## Shutdown Sequence
//!
//! 1. Signal shutdown to every task
//! 2. Complete all document streams
//! 3. Wait for the tasks, bounded by [`SHUTDOWN_GRACE`]

use crate::config::{AdapterKind, ConfigError, LedgerBackend, RuntimeConfig};
use crate::documents::DocumentPipeline;
use crate::orchestrator::PermissionOrchestrator;
use crate::permission_documents::PermissionDocumentProducer;
use crate::registry::{AdapterRegistry, RegistryError};
use crate::simulation::{SimulationConnector, SimulationRetransmissionService};
use cg_01_permission_projection::{
    InMemoryPermissionRequestRepository, NotificationExtension, PermissionRequestRepository,
    PersistenceExtension,
};
use cg_02_event_store::{EventLedger, FileEventLedger, InMemoryEventLedger, LedgerError, Outbox};
use cg_03_data_needs::{CapabilityError, DataNeedCatalog, DataNeedMatcher, InMemoryDataNeedCatalog};
use cg_04_stale_reclaimer::StaleRequestReclaimer;
use cg_05_document_broker::DocumentBrokerRegistry;
use cg_06_retransmission::{RetransmissionRouter, RetransmissionValidation};
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use shared_bus::{EventFilter, InMemoryEventBus};
use shared_types::{
    AdapterStatusUpdate, Clock, DataNeedId, RegionConnectorId, RetransmissionRequest,
    RetransmissionResult, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Upper bound for tasks to finish after shutdown was signalled.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("Unknown data need {0}")]
    UnknownDataNeed(DataNeedId),

    #[error("Failed to rebuild read model: {0}")]
    Resync(String),

    #[error("Runtime already started")]
    AlreadyStarted,
}

/// What connector factories get to work with.
pub struct AdapterContext {
    pub clock: Arc<dyn Clock>,
    pub catalog: Arc<dyn DataNeedCatalog>,
    pub requests: Arc<dyn PermissionRequestRepository>,
}

impl AdapterContext {
    /// The shared checks every retransmission service runs first.
    #[must_use]
    pub fn retransmission_validation(&self) -> RetransmissionValidation {
        RetransmissionValidation::new(self.catalog.clone(), self.clock.clone())
    }
}

pub struct ConsentGrid {
    config: RuntimeConfig,
    clock: Arc<dyn Clock>,
    bus: Arc<InMemoryEventBus>,
    outbox: Arc<Outbox>,
    repository: Arc<dyn PermissionRequestRepository>,
    persistence: Arc<PersistenceExtension>,
    notifications: Arc<NotificationExtension>,
    catalog: Arc<dyn DataNeedCatalog>,
    matcher: DataNeedMatcher,
    adapters: Arc<AdapterRegistry>,
    orchestrator: Arc<PermissionOrchestrator>,
    reclaimer: Arc<StaleRequestReclaimer>,
    brokers: Arc<DocumentBrokerRegistry>,
    router: Arc<RetransmissionRouter>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: Mutex<bool>,
}

impl ConsentGrid {
    /// Runtime on the system clock with the connectors named in `config`.
    ///
    /// # Errors
    ///
    /// Invalid configuration, an unusable ledger or a duplicate connector.
    pub fn build(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let adapters = config.adapters.clone();
        Self::build_with(config, Arc::new(SystemClock), move |ctx| {
            let mut registry = AdapterRegistry::new();
            for adapter in adapters.iter().filter(|a| a.enabled) {
                match adapter.kind {
                    AdapterKind::Simulation => {
                        let connector = Arc::new(
                            SimulationConnector::new(adapter.id.clone(), adapter.country_code.clone())
                                .with_auto_accept(adapter.auto_accept),
                        );
                        let retransmission = Arc::new(SimulationRetransmissionService::new(
                            connector.clone(),
                            ctx.requests.clone(),
                            ctx.retransmission_validation(),
                        ));
                        registry.register(connector, Some(retransmission))?;
                    }
                }
            }
            Ok(registry)
        })
    }

    /// Runtime with an explicit clock and connector set.
    ///
    /// # Errors
    ///
    /// Invalid configuration, an unusable ledger or whatever `adapters`
    /// returns.
    pub fn build_with<F>(config: RuntimeConfig, clock: Arc<dyn Clock>, adapters: F) -> Result<Self, RuntimeError>
    where
        F: FnOnce(&AdapterContext) -> Result<AdapterRegistry, RegistryError>,
    {
        config.validate()?;
        info!("Building Consent-Grid runtime");

        let ledger: Arc<dyn EventLedger> = match config.event_store.backend {
            LedgerBackend::Memory => Arc::new(InMemoryEventLedger::new()),
            LedgerBackend::File => Arc::new(FileEventLedger::open(&config.event_store.path)?),
        };
        let bus = Arc::new(InMemoryEventBus::with_capacity(config.bus.capacity));
        let outbox = Arc::new(Outbox::new(ledger, bus.clone()));

        let repository: Arc<dyn PermissionRequestRepository> =
            Arc::new(InMemoryPermissionRequestRepository::new());
        let persistence = Arc::new(PersistenceExtension::new(outbox.history(), repository.clone()));
        let notifications = Arc::new(NotificationExtension::new(outbox.history()));

        let catalog: Arc<dyn DataNeedCatalog> =
            Arc::new(InMemoryDataNeedCatalog::with_needs(config.data_needs.iter().cloned()));

        let context = AdapterContext {
            clock: clock.clone(),
            catalog: catalog.clone(),
            requests: repository.clone(),
        };
        let adapters = Arc::new(adapters(&context)?);
        if adapters.is_empty() {
            warn!("No region connector registered");
        }

        let matcher = DataNeedMatcher::new();
        let router = Arc::new(RetransmissionRouter::new(&config.retransmission, clock.clone()));
        for (id, adapter) in adapters.iter() {
            matcher.register(id.clone(), adapter.connector.rule_set());
            if let Some(service) = &adapter.retransmission {
                router.register(id.clone(), service.clone());
            }
        }

        let orchestrator = Arc::new(PermissionOrchestrator::new(
            outbox.clone(),
            adapters.clone(),
            catalog.clone(),
            clock.clone(),
        ));
        let reclaimer = Arc::new(StaleRequestReclaimer::new(
            outbox.clone(),
            clock.clone(),
            config.reclaimer.clone(),
        ));
        let brokers = Arc::new(DocumentBrokerRegistry::from_config(&config.broker));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            clock,
            bus,
            outbox,
            repository,
            persistence,
            notifications,
            catalog,
            matcher,
            adapters,
            orchestrator,
            reclaimer,
            brokers,
            router,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
            started: Mutex::new(false),
        })
    }

    /// Spawn every background task.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` on a second call, `Resync` if the ledger cannot be
    /// read back.
    pub fn start(&self) -> Result<(), RuntimeError> {
        {
            let mut started = self.started.lock();
            if *started {
                return Err(RuntimeError::AlreadyStarted);
            }
            *started = true;
        }

        // Subscribe before the resync so nothing committed in between is lost
        let persistence_sub = self.bus.subscribe(EventFilter::all());
        let notification_sub = self.bus.subscribe(EventFilter::external());
        let permission_documents = PermissionDocumentProducer::for_streams(
            &self.config.broker.streams,
            self.outbox.history(),
        )
        .map(|producer| (producer, self.bus.subscribe(EventFilter::external())));
        let projected = self
            .persistence
            .resync()
            .map_err(|e| RuntimeError::Resync(e.to_string()))?;

        let mut tasks = Vec::new();
        tasks.push(
            self.persistence
                .clone()
                .spawn(persistence_sub, self.shutdown_rx.clone()),
        );
        tasks.push(
            self.notifications
                .clone()
                .spawn(notification_sub, self.shutdown_rx.clone()),
        );
        tasks.push(self.reclaimer.clone().spawn(self.shutdown_rx.clone()));

        for (id, adapter) in self.adapters.iter() {
            tasks.push(self.spawn_status_updates(id.clone(), adapter.connector.status_updates()));

            let pipeline = DocumentPipeline::new(
                adapter.connector.metadata(),
                &self.config.broker.streams,
                self.repository.clone(),
            );
            tasks.extend(pipeline.spawn(
                adapter.connector.readings(),
                &self.brokers,
                self.shutdown_rx.clone(),
            ));
        }

        if let Some((producer, subscription)) = permission_documents {
            tasks.extend(producer.spawn(subscription, &self.brokers, self.shutdown_rx.clone()));
        }

        info!(
            adapters = self.adapters.len(),
            streams = self.brokers.keys().len(),
            projected,
            "Consent-Grid runtime started"
        );
        self.tasks.lock().extend(tasks);
        Ok(())
    }

    fn spawn_status_updates(
        &self,
        region_connector_id: RegionConnectorId,
        mut updates: BoxStream<'static, AdapterStatusUpdate>,
    ) -> JoinHandle<()> {
        let orchestrator = self.orchestrator.clone();
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    update = updates.next() => {
                        let Some(update) = update else { break };
                        let permission_id = update.permission_id.clone();
                        if let Err(e) = orchestrator.apply_status_update(&region_connector_id, update).await {
                            warn!(
                                region_connector = %region_connector_id,
                                permission_id = %permission_id,
                                error = %e,
                                "Status update not applied"
                            );
                        }
                    }
                }
            }
            debug!(region_connector = %region_connector_id, "Status update loop stopped");
        })
    }

    /// Stop every task and complete every document stream.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        self.brokers.close_all();

        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        let wait = futures::future::join_all(tasks);
        match tokio::time::timeout(SHUTDOWN_GRACE, wait).await {
            Ok(results) => {
                for result in results.into_iter().filter_map(Result::err) {
                    error!(error = %result, "Task ended abnormally");
                }
            }
            Err(_) => warn!(grace = ?SHUTDOWN_GRACE, "Tasks still running after shutdown grace"),
        }
        info!("Shutdown complete");
    }

    /// Route a retransmission request to the connector it names.
    pub async fn retransmit(&self, request: RetransmissionRequest) -> RetransmissionResult {
        let region_connector_id = request.region_connector_id.clone();
        self.router.route(&region_connector_id, request).await
    }

    /// Connectors able to serve the data need.
    ///
    /// # Errors
    ///
    /// `UnknownDataNeed` if the catalog lacks it, `Capability` if no
    /// connector supports it.
    pub fn supporting_adapters(&self, data_need_id: &DataNeedId) -> Result<Vec<RegionConnectorId>, RuntimeError> {
        let need = self
            .catalog
            .find(data_need_id)
            .ok_or_else(|| RuntimeError::UnknownDataNeed(data_need_id.clone()))?;
        Ok(self.matcher.supporting_adapters(&need)?)
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    #[must_use]
    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        self.bus.clone()
    }

    #[must_use]
    pub fn outbox(&self) -> Arc<Outbox> {
        self.outbox.clone()
    }

    #[must_use]
    pub fn repository(&self) -> Arc<dyn PermissionRequestRepository> {
        self.repository.clone()
    }

    #[must_use]
    pub fn notifications(&self) -> Arc<NotificationExtension> {
        self.notifications.clone()
    }

    #[must_use]
    pub fn adapters(&self) -> Arc<AdapterRegistry> {
        self.adapters.clone()
    }

    #[must_use]
    pub fn orchestrator(&self) -> Arc<PermissionOrchestrator> {
        self.orchestrator.clone()
    }

    #[must_use]
    pub fn reclaimer(&self) -> Arc<StaleRequestReclaimer> {
        self.reclaimer.clone()
    }

    #[must_use]
    pub fn brokers(&self) -> Arc<DocumentBrokerRegistry> {
        self.brokers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterConfig;
    use crate::orchestrator::CreatePermission;
    use cg_05_document_broker::SubscriptionMode;
    use shared_types::{
        ConnectionId, DataNeed, DataNeedKind, DocumentKind, PermissionId, SchemaVersion,
    };

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            adapters: vec![AdapterConfig::default()],
            data_needs: vec![DataNeed {
                id: DataNeedId::new("ap"),
                name: "Accounting point".into(),
                enabled: true,
                region_connector_filter: None,
                kind: DataNeedKind::AccountingPoint,
            }],
            ..RuntimeConfig::default()
        }
    }

    #[tokio::test]
    async fn test_build_registers_configured_adapters() {
        let grid = ConsentGrid::build(config()).unwrap();
        assert_eq!(grid.adapters().ids(), vec![RegionConnectorId::new("sim")]);
        assert_eq!(
            grid.supporting_adapters(&DataNeedId::new("ap")).unwrap(),
            vec![RegionConnectorId::new("sim")]
        );
        assert!(matches!(
            grid.supporting_adapters(&DataNeedId::new("missing")),
            Err(RuntimeError::UnknownDataNeed(_))
        ));
    }

    #[tokio::test]
    async fn test_start_twice_is_refused() {
        let grid = ConsentGrid::build(config()).unwrap();
        grid.start().unwrap();
        assert!(matches!(grid.start(), Err(RuntimeError::AlreadyStarted)));
        grid.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_completes_document_streams() {
        let grid = ConsentGrid::build(config()).unwrap();
        grid.start().unwrap();
        let mut documents = grid
            .brokers()
            .subscribe(
                DocumentKind::ValidatedHistoricalData,
                SchemaVersion::new("1.04"),
                SubscriptionMode::Live,
            )
            .unwrap();

        grid.shutdown().await;
        assert!(documents.next().await.is_none());
    }

    #[tokio::test]
    async fn test_permission_events_reach_permission_documents() {
        let grid = ConsentGrid::build(config()).unwrap();
        grid.start().unwrap();
        let mut documents = grid
            .brokers()
            .subscribe(
                DocumentKind::PermissionMarketDocument,
                SchemaVersion::new("1.04"),
                SubscriptionMode::Live,
            )
            .unwrap();

        let created = grid
            .orchestrator()
            .create(CreatePermission {
                connection_id: ConnectionId::new("conn-1"),
                data_need_id: DataNeedId::new("ap"),
                region_connector_id: RegionConnectorId::new("sim"),
            })
            .await
            .unwrap();
        let first = tokio::time::timeout(Duration::from_secs(1), documents.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.header.permission_id, created.permission_id);
        assert_eq!(first.payload["permission"]["status"], "CREATED");

        grid.shutdown().await;
        while documents.next().await.is_some() {}
    }

    #[tokio::test]
    async fn test_unknown_connector_retransmission() {
        let grid = ConsentGrid::build(config()).unwrap();
        let result = grid
            .retransmit(RetransmissionRequest {
                region_connector_id: RegionConnectorId::new("elsewhere"),
                permission_id: PermissionId::new("p1"),
                from: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                to: chrono::NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            })
            .await;
        assert!(matches!(
            result,
            RetransmissionResult::RetransmissionServiceNotFound { .. }
        ));
    }
}
