//! # Data Need Calculation Service
//!
//! Evaluates data needs on behalf of one adapter: is the need supported, at
//! which granularities, for which energy window and for how long must the
//! permission stay valid.

use crate::domain::calculation::{DataNeedCalculation, MultipleDataNeedCalculation};
use crate::domain::matching::supported_granularities;
use crate::domain::timeframe::{
    DefaultEnergyDataTimeframeStrategy, EnergyDataTimeframeStrategy,
    PermissionEndIsEnergyDataEndStrategy, PermissionTimeframeStrategy, TimeframeBounds,
};
use crate::ports::outbound::DataNeedCatalog;
use chrono::NaiveDate;
use shared_types::{
    Clock, DataNeed, DataNeedId, DataNeedKind, DataNeedRule, DataNeedRuleSet,
    RegionConnectorFilterType, RegionConnectorId, RegionConnectorMetadata,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct DataNeedCalculationService {
    catalog: Arc<dyn DataNeedCatalog>,
    metadata: RegionConnectorMetadata,
    rule_set: DataNeedRuleSet,
    permission_strategy: Box<dyn PermissionTimeframeStrategy>,
    energy_strategy: Box<dyn EnergyDataTimeframeStrategy>,
    clock: Arc<dyn Clock>,
}

impl DataNeedCalculationService {
    /// Service with the default strategies: the permission ends with the
    /// energy data, relative durations are clipped to the adapter's bounds.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn DataNeedCatalog>,
        metadata: RegionConnectorMetadata,
        rule_set: DataNeedRuleSet,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            metadata,
            rule_set,
            permission_strategy: Box::new(PermissionEndIsEnergyDataEndStrategy),
            energy_strategy: Box::new(DefaultEnergyDataTimeframeStrategy),
            clock,
        }
    }

    #[must_use]
    pub fn with_permission_strategy(
        mut self,
        strategy: impl PermissionTimeframeStrategy + 'static,
    ) -> Self {
        self.permission_strategy = Box::new(strategy);
        self
    }

    #[must_use]
    pub fn with_energy_strategy(mut self, strategy: impl EnergyDataTimeframeStrategy + 'static) -> Self {
        self.energy_strategy = Box::new(strategy);
        self
    }

    #[must_use]
    pub fn region_connector_id(&self) -> &RegionConnectorId {
        &self.metadata.id
    }

    #[must_use]
    pub fn rule_set(&self) -> &DataNeedRuleSet {
        &self.rule_set
    }

    /// Evaluate the data need with the given id.
    #[must_use]
    pub fn calculate(&self, id: &DataNeedId) -> DataNeedCalculation {
        self.calculate_at(id, self.clock.today())
    }

    #[must_use]
    pub fn calculate_at(&self, id: &DataNeedId, today: NaiveDate) -> DataNeedCalculation {
        match self.catalog.find(id) {
            Some(need) => self.calculate_need(&need, today),
            None => DataNeedCalculation::NotFound,
        }
    }

    /// Evaluate an already loaded data need.
    #[must_use]
    pub fn calculate_need(&self, need: &DataNeed, today: NaiveDate) -> DataNeedCalculation {
        if !need.enabled {
            return DataNeedCalculation::not_supported("Data need is disabled");
        }

        if let Some(filter) = &need.region_connector_filter {
            if !filter.permits(&self.metadata.id) {
                let message = match filter.filter_type {
                    RegionConnectorFilterType::Allowlist => {
                        format!("Region connector {} is not in the allowlist", self.metadata.id)
                    }
                    RegionConnectorFilterType::Blocklist => {
                        format!("Region connector {} is in the blocklist", self.metadata.id)
                    }
                };
                return DataNeedCalculation::not_supported(message);
            }
        }

        if !self.has_rule_for(need) {
            return DataNeedCalculation::not_supported(format!(
                "Data need type \"{}\" not supported, region connector supports data needs of types {}",
                need.kind.type_name(),
                self.rule_set.supported_type_names().join(", ")
            ));
        }

        let bounds = TimeframeBounds::for_adapter(&self.metadata, today);
        let energy = match self.energy_strategy.energy_data_timeframe(need, today, bounds) {
            Ok(energy) => energy,
            Err(e) => {
                debug!(data_need_id = %need.id, error = %e, "Energy data timeframe rejected");
                return DataNeedCalculation::not_supported(e.to_string());
            }
        };
        let permission_timeframe = self.permission_strategy.permission_timeframe(energy.as_ref(), today);

        match (&need.kind, energy) {
            (DataNeedKind::AccountingPoint, _) => DataNeedCalculation::AccountingPoint {
                permission_timeframe,
            },
            (DataNeedKind::ValidatedHistoricalData { energy_type, .. }, Some(energy_timeframe)) => {
                let Some(granularities) = self.rule_set.rules.iter().find_map(|rule| match rule {
                    DataNeedRule::ValidatedHistoricalData {
                        energy_type: offered,
                        granularities,
                    } if offered == energy_type => Some(granularities),
                    _ => None,
                }) else {
                    return DataNeedCalculation::not_supported("Energy type is not supported");
                };

                let granularities = supported_granularities(need, granularities);
                if granularities.is_empty() {
                    return DataNeedCalculation::not_supported("Granularities are not supported");
                }
                DataNeedCalculation::ValidatedHistoricalData {
                    granularities,
                    permission_timeframe,
                    energy_timeframe,
                }
            }
            (DataNeedKind::ValidatedHistoricalData { .. }, None) => {
                warn!(
                    data_need_id = %need.id,
                    region_connector_id = %self.metadata.id,
                    "No energy data timeframe for validated historical data need"
                );
                DataNeedCalculation::not_supported("Could not calculate timeframe for this data need")
            }
        }
    }

    /// Evaluate several data needs requested in one permission.
    #[must_use]
    pub fn calculate_all(&self, ids: &[DataNeedId]) -> MultipleDataNeedCalculation {
        self.calculate_all_at(ids, self.clock.today())
    }

    #[must_use]
    pub fn calculate_all_at(&self, ids: &[DataNeedId], today: NaiveDate) -> MultipleDataNeedCalculation {
        let unique: BTreeSet<DataNeedId> = ids.iter().cloned().collect();

        if unique.len() == 1 {
            let results = unique
                .into_iter()
                .map(|id| {
                    let calculation = self.calculate_at(&id, today);
                    (id, calculation)
                })
                .collect();
            return MultipleDataNeedCalculation::Results { results };
        }

        if !self.rule_set.allows_multiple() {
            return MultipleDataNeedCalculation::InvalidCombination {
                data_need_ids: unique,
                message: "Multiple data needs not supported".into(),
            };
        }

        let mut results = BTreeMap::new();
        let mut needs = Vec::new();
        for id in unique {
            match self.catalog.find(&id) {
                Some(need) => needs.push(need),
                None => {
                    results.insert(id, DataNeedCalculation::NotFound);
                }
            }
        }

        if let Some(invalid) = check_combination(&needs) {
            return invalid;
        }

        for need in &needs {
            results.insert(need.id.clone(), self.calculate_need(need, today));
        }
        MultipleDataNeedCalculation::Results { results }
    }

    fn has_rule_for(&self, need: &DataNeed) -> bool {
        self.rule_set.rules.iter().any(|rule| {
            matches!(
                (&need.kind, rule),
                (DataNeedKind::AccountingPoint, DataNeedRule::AccountingPoint)
                    | (
                        DataNeedKind::ValidatedHistoricalData { .. },
                        DataNeedRule::ValidatedHistoricalData { .. }
                    )
            )
        })
    }
}

/// At most one accounting-point need, and distinct energy types among the
/// validated-historical-data needs.
fn check_combination(needs: &[DataNeed]) -> Option<MultipleDataNeedCalculation> {
    let accounting: BTreeSet<DataNeedId> = needs
        .iter()
        .filter(|n| n.is_accounting_point())
        .map(|n| n.id.clone())
        .collect();
    if accounting.len() > 1 {
        return Some(MultipleDataNeedCalculation::InvalidCombination {
            data_need_ids: accounting,
            message: "Only one accounting point data need allowed at a time".into(),
        });
    }

    let validated: Vec<&DataNeed> = needs.iter().filter(|n| n.energy_type().is_some()).collect();
    let energy_types: HashSet<_> = validated.iter().filter_map(|n| n.energy_type()).collect();
    if energy_types.len() != validated.len() {
        return Some(MultipleDataNeedCalculation::InvalidCombination {
            data_need_ids: validated.iter().map(|n| n.id.clone()).collect(),
            message: "Only one energy type allowed for validated historical data need at a time".into(),
        });
    }

    None
}
