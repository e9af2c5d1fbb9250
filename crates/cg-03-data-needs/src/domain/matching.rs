//! # Rule Matching
//!
//! Whether one capability rule of an adapter covers a data need.

use shared_types::{DataNeed, DataNeedKind, DataNeedRule, Granularity};

/// Whether `rule` can serve `need`.
///
/// A validated-historical-data rule matches if the energy type is equal and
/// at least one of its granularities lies in the need's inclusive range.
#[must_use]
pub fn matches(need: &DataNeed, rule: &DataNeedRule) -> bool {
    match (&need.kind, rule) {
        (DataNeedKind::AccountingPoint, DataNeedRule::AccountingPoint) => true,
        (
            DataNeedKind::ValidatedHistoricalData { energy_type, .. },
            DataNeedRule::ValidatedHistoricalData {
                energy_type: rule_energy,
                granularities,
            },
        ) => energy_type == rule_energy && !supported_granularities(need, granularities).is_empty(),
        _ => false,
    }
}

/// All of `offered` inside the need's granularity range, finest first.
#[must_use]
pub fn supported_granularities(need: &DataNeed, offered: &[Granularity]) -> Vec<Granularity> {
    let Some((min, max)) = need.granularity_range() else {
        return Vec::new();
    };
    let mut found: Vec<Granularity> = offered
        .iter()
        .copied()
        .filter(|g| (min..=max).contains(g))
        .collect();
    found.sort();
    found.dedup();
    found
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use shared_types::{DataNeedDuration, DataNeedId, EnergyType, Period};

    pub fn vhd_need(
        energy_type: EnergyType,
        granularity: Granularity,
        max_granularity: Option<Granularity>,
    ) -> DataNeed {
        DataNeed {
            id: DataNeedId::new("vhd"),
            name: "Validated data".into(),
            enabled: true,
            region_connector_filter: None,
            kind: DataNeedKind::ValidatedHistoricalData {
                energy_type,
                granularity,
                max_granularity,
                duration: DataNeedDuration::Relative {
                    start: Some(Period::days(-10)),
                    end: Some(Period::days(3)),
                },
            },
        }
    }

    fn vhd_rule(energy_type: EnergyType, granularities: Vec<Granularity>) -> DataNeedRule {
        DataNeedRule::ValidatedHistoricalData {
            energy_type,
            granularities,
        }
    }

    #[test]
    fn test_exact_granularity_in_rule() {
        let rule = vhd_rule(EnergyType::Electricity, vec![Granularity::PT15M, Granularity::P1D]);
        assert!(matches(&vhd_need(EnergyType::Electricity, Granularity::PT15M, None), &rule));
        assert!(!matches(&vhd_need(EnergyType::Electricity, Granularity::PT1H, None), &rule));
    }

    #[test]
    fn test_energy_type_must_match() {
        let rule = vhd_rule(EnergyType::NaturalGas, vec![Granularity::PT15M]);
        assert!(!matches(&vhd_need(EnergyType::Electricity, Granularity::PT15M, None), &rule));
    }

    #[test]
    fn test_range_accepts_coarser_granularity() {
        let rule = vhd_rule(EnergyType::Electricity, vec![Granularity::P1D]);
        let need = vhd_need(EnergyType::Electricity, Granularity::PT15M, Some(Granularity::P1D));
        assert!(matches(&need, &rule));
        assert_eq!(
            supported_granularities(&need, &[Granularity::P1D, Granularity::PT5M, Granularity::PT1H]),
            vec![Granularity::PT1H, Granularity::P1D]
        );
    }

    #[test]
    fn test_kinds_do_not_cross() {
        let accounting = DataNeed {
            kind: DataNeedKind::AccountingPoint,
            ..vhd_need(EnergyType::Electricity, Granularity::PT15M, None)
        };
        assert!(matches(&accounting, &DataNeedRule::AccountingPoint));
        assert!(!matches(&accounting, &vhd_rule(EnergyType::Electricity, vec![Granularity::PT15M])));
        assert!(!matches(
            &vhd_need(EnergyType::Electricity, Granularity::PT15M, None),
            &DataNeedRule::AccountingPoint
        ));
        assert!(!matches(&accounting, &DataNeedRule::AllowMultipleDataNeeds));
    }

    proptest! {
        #[test]
        fn prop_supported_granularities_stay_in_range(
            min in 0usize..8,
            span in 0usize..8,
            offered in proptest::collection::vec(0usize..8, 0..8),
        ) {
            let max = (min + span).min(7);
            let need = vhd_need(EnergyType::Electricity, Granularity::ALL[min], Some(Granularity::ALL[max]));
            let offered: Vec<Granularity> = offered.into_iter().map(|i| Granularity::ALL[i]).collect();
            let found = supported_granularities(&need, &offered);
            prop_assert!(found.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(found.iter().all(|g| *g >= Granularity::ALL[min] && *g <= Granularity::ALL[max]));
            prop_assert!(found.iter().all(|g| offered.contains(g)));
        }
    }
}
