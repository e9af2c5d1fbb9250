//! # Data Need Matcher
//!
//! Cross-adapter view: which registered adapters can serve a data need at
//! all. Used before a permission request is routed.

use crate::domain::errors::CapabilityError;
use crate::domain::matching::matches;
use parking_lot::RwLock;
use shared_types::{DataNeed, DataNeedRuleSet, RegionConnectorId};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct DataNeedMatcher {
    rule_sets: RwLock<BTreeMap<RegionConnectorId, DataNeedRuleSet>>,
}

impl DataNeedMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the rules of one adapter.
    pub fn register(&self, id: RegionConnectorId, rule_set: DataNeedRuleSet) {
        self.rule_sets.write().insert(id, rule_set);
    }

    #[must_use]
    pub fn adapter_count(&self) -> usize {
        self.rule_sets.read().len()
    }

    /// Ids of every adapter with a rule matching `need`, in id order.
    ///
    /// Disabled needs and region-connector filters are honoured.
    pub fn supporting_adapters(
        &self,
        need: &DataNeed,
    ) -> Result<Vec<RegionConnectorId>, CapabilityError> {
        let supporting: Vec<RegionConnectorId> = if need.enabled {
            self.rule_sets
                .read()
                .iter()
                .filter(|(id, _)| {
                    need.region_connector_filter
                        .as_ref()
                        .map_or(true, |filter| filter.permits(id))
                })
                .filter(|(_, rules)| rules.rules.iter().any(|rule| matches(need, rule)))
                .map(|(id, _)| id.clone())
                .collect()
        } else {
            Vec::new()
        };

        if supporting.is_empty() {
            return Err(CapabilityError::NoAdapterSupports {
                data_need_id: need.id.clone(),
                message: format!("No region connector supports data need {}", need.id),
            });
        }
        Ok(supporting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::matching::tests::vhd_need;
    use shared_types::{
        DataNeedRule, EnergyType, Granularity, RegionConnectorFilter, RegionConnectorFilterType,
    };

    fn matcher() -> DataNeedMatcher {
        let matcher = DataNeedMatcher::new();
        matcher.register(
            RegionConnectorId::new("at-eda"),
            DataNeedRuleSet::new(vec![DataNeedRule::ValidatedHistoricalData {
                energy_type: EnergyType::Electricity,
                granularities: vec![Granularity::PT15M, Granularity::P1D],
            }]),
        );
        matcher.register(
            RegionConnectorId::new("dk-energinet"),
            DataNeedRuleSet::new(vec![DataNeedRule::ValidatedHistoricalData {
                energy_type: EnergyType::Electricity,
                granularities: vec![Granularity::PT1H],
            }]),
        );
        matcher
    }

    #[test]
    fn test_only_matching_adapters_are_returned() {
        let need = vhd_need(EnergyType::Electricity, Granularity::PT15M, None);
        assert_eq!(
            matcher().supporting_adapters(&need).unwrap(),
            vec![RegionConnectorId::new("at-eda")]
        );

        let wide = vhd_need(EnergyType::Electricity, Granularity::PT15M, Some(Granularity::P1D));
        assert_eq!(matcher().supporting_adapters(&wide).unwrap().len(), 2);
    }

    #[test]
    fn test_filter_excludes_adapter() {
        let mut need = vhd_need(EnergyType::Electricity, Granularity::PT15M, Some(Granularity::P1D));
        need.region_connector_filter = Some(RegionConnectorFilter {
            filter_type: RegionConnectorFilterType::Blocklist,
            region_connector_ids: vec![RegionConnectorId::new("at-eda")],
        });
        assert_eq!(
            matcher().supporting_adapters(&need).unwrap(),
            vec![RegionConnectorId::new("dk-energinet")]
        );
    }

    #[test]
    fn test_no_adapter_supports() {
        let need = vhd_need(EnergyType::Heat, Granularity::PT15M, None);
        let err = matcher().supporting_adapters(&need).unwrap_err();
        assert!(matches!(err, CapabilityError::NoAdapterSupports { ref data_need_id, .. } if data_need_id.as_str() == "vhd"));
    }
}
