//! # Test Harness
//!
//! A started [`ConsentGrid`] on a [`ManualClock`] with one simulation
//! connector `sim` and a small data-need catalog.

use cg_01_permission_projection::PermissionRequestRepository;
use cg_runtime::{
    AdapterRegistry, ConsentGrid, CreatePermission, RuntimeConfig, SimulationConnector,
    SimulationRetransmissionService,
};
use chrono::{DateTime, TimeZone, Utc};
use shared_types::{
    Clock, ConnectionId, DataNeed, DataNeedDuration, DataNeedId, DataNeedKind, DocumentKind, EnergyType,
    Granularity, ManualClock, Period, PermissionId, PermissionRequest, PermissionStatus, RawReading,
    RegionConnectorId,
};
use std::sync::Arc;
use std::time::Duration;

/// How long polling helpers wait before giving up.
pub const WAIT: Duration = Duration::from_secs(5);

pub struct Harness {
    pub grid: ConsentGrid,
    pub clock: Arc<ManualClock>,
    pub sim: Arc<SimulationConnector>,
}

impl Harness {
    /// Started runtime with an in-memory ledger.
    pub fn start(auto_accept: bool) -> Self {
        Self::start_with(config(), auto_accept)
    }

    pub fn start_with(config: RuntimeConfig, auto_accept: bool) -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let sim = Arc::new(SimulationConnector::new(sim_id(), "AT").with_auto_accept(auto_accept));

        let registered = sim.clone();
        let grid = ConsentGrid::build_with(config, clock.clone(), move |ctx| {
            let mut registry = AdapterRegistry::new();
            let retransmission = Arc::new(SimulationRetransmissionService::new(
                registered.clone(),
                ctx.requests.clone(),
                ctx.retransmission_validation(),
            ));
            registry.register(registered, Some(retransmission))?;
            Ok(registry)
        })
        .expect("runtime builds");
        grid.start().expect("runtime starts");

        Self { grid, clock, sim }
    }

    /// Create a permission for `data_need` on `sim`.
    pub async fn create(&self, data_need: &str) -> (PermissionId, PermissionStatus) {
        let created = self
            .grid
            .orchestrator()
            .create(command(data_need))
            .await
            .expect("create succeeds");
        (created.permission_id, created.status)
    }

    /// Poll the read model until `permission_id` reaches `status`.
    pub async fn wait_for_status(&self, permission_id: &PermissionId, status: PermissionStatus) -> PermissionRequest {
        let repository = self.grid.repository();
        let wanted = permission_id.clone();
        tokio::time::timeout(WAIT, async move {
            loop {
                if let Some(request) = repository.get(&wanted) {
                    if request.status == status {
                        return request;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("{permission_id} never reached {status}"))
    }

    /// A reading for `permission_id` as the connector would deliver it.
    pub fn reading(&self, permission_id: &PermissionId, payload: serde_json::Value) -> RawReading {
        RawReading {
            permission_id: permission_id.clone(),
            connection_id: ConnectionId::new("conn-1"),
            data_need_id: DataNeedId::new("future-15m"),
            kind: DocumentKind::ValidatedHistoricalData,
            received: self.clock.now(),
            payload,
        }
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

pub fn sim_id() -> RegionConnectorId {
    RegionConnectorId::new("sim")
}

pub fn command(data_need: &str) -> CreatePermission {
    CreatePermission {
        connection_id: ConnectionId::new("conn-1"),
        data_need_id: DataNeedId::new(data_need),
        region_connector_id: sim_id(),
    }
}

fn vhd(id: &str, granularity: Granularity, start: Period, end: Period) -> DataNeed {
    DataNeed {
        id: DataNeedId::new(id),
        name: id.into(),
        enabled: true,
        region_connector_filter: None,
        kind: DataNeedKind::ValidatedHistoricalData {
            energy_type: EnergyType::Electricity,
            granularity,
            max_granularity: Some(Granularity::P1D),
            duration: DataNeedDuration::Relative {
                start: Some(start),
                end: Some(end),
            },
        },
    }
}

/// `ap`, `future-15m` (today .. +10 days) and `past-hourly` (-30 .. -1 days).
pub fn data_needs() -> Vec<DataNeed> {
    vec![
        DataNeed {
            id: DataNeedId::new("ap"),
            name: "Accounting point".into(),
            enabled: true,
            region_connector_filter: None,
            kind: DataNeedKind::AccountingPoint,
        },
        vhd("future-15m", Granularity::PT15M, Period::days(0), Period::days(10)),
        vhd("past-hourly", Granularity::PT1H, Period::days(-30), Period::days(-1)),
    ]
}

/// Defaults plus the test catalog, with no connectors from configuration.
pub fn config() -> RuntimeConfig {
    RuntimeConfig {
        adapters: Vec::new(),
        data_needs: data_needs(),
        ..RuntimeConfig::default()
    }
}
