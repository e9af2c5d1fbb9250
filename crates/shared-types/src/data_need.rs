//! # Data Needs
//!
//! What an eligible party asks for (a [`DataNeed`]) and what an adapter can
//! provide (a [`DataNeedRuleSet`]).

use crate::ids::{DataNeedId, RegionConnectorId};
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// ENERGY TYPE & GRANULARITY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergyType {
    Electricity,
    NaturalGas,
    Hydrogen,
    Heat,
}

/// Metering resolution, ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Granularity {
    PT5M,
    PT10M,
    PT15M,
    PT30M,
    PT1H,
    P1D,
    P1M,
    P1Y,
}

impl Granularity {
    pub const ALL: [Granularity; 8] = [
        Self::PT5M,
        Self::PT10M,
        Self::PT15M,
        Self::PT30M,
        Self::PT1H,
        Self::P1D,
        Self::P1M,
        Self::P1Y,
    ];
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// PERIOD
// =============================================================================

/// A calendar offset relative to a date. Negative values point into the past.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Period {
    #[serde(default)]
    pub months: i32,
    #[serde(default)]
    pub days: i32,
}

impl Period {
    #[must_use]
    pub const fn days(days: i32) -> Self {
        Self { months: 0, days }
    }

    #[must_use]
    pub const fn months(months: i32) -> Self {
        Self { months, days: 0 }
    }

    /// Apply the offset to `date`, months first. `None` on calendar overflow.
    #[must_use]
    pub fn apply(&self, date: NaiveDate) -> Option<NaiveDate> {
        let months = Months::new(self.months.unsigned_abs());
        let with_months = if self.months >= 0 {
            date.checked_add_months(months)?
        } else {
            date.checked_sub_months(months)?
        };
        let days = Days::new(u64::from(self.days.unsigned_abs()));
        if self.days >= 0 {
            with_months.checked_add_days(days)
        } else {
            with_months.checked_sub_days(days)
        }
    }
}

// =============================================================================
// DATA NEED
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionConnectorFilterType {
    Allowlist,
    Blocklist,
}

/// Restricts which adapters may serve a data need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConnectorFilter {
    #[serde(rename = "type")]
    pub filter_type: RegionConnectorFilterType,
    pub region_connector_ids: Vec<RegionConnectorId>,
}

impl RegionConnectorFilter {
    /// Whether `id` passes the filter.
    #[must_use]
    pub fn permits(&self, id: &RegionConnectorId) -> bool {
        let listed = self.region_connector_ids.contains(id);
        match self.filter_type {
            RegionConnectorFilterType::Allowlist => listed,
            RegionConnectorFilterType::Blocklist => !listed,
        }
    }
}

/// Requested energy-data window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataNeedDuration {
    /// Offsets from today. `None` means as far as the adapter allows.
    Relative {
        start: Option<Period>,
        end: Option<Period>,
    },
    Absolute { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataNeedKind {
    AccountingPoint,
    ValidatedHistoricalData {
        energy_type: EnergyType,
        granularity: Granularity,
        /// Coarsest acceptable granularity. Absent means exactly `granularity`.
        #[serde(default)]
        max_granularity: Option<Granularity>,
        duration: DataNeedDuration,
    },
}

impl DataNeedKind {
    /// Name used in user-facing messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::AccountingPoint => "account",
            Self::ValidatedHistoricalData { .. } => "validated",
        }
    }
}

/// A submitted, immutable data need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataNeed {
    pub id: DataNeedId,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub region_connector_filter: Option<RegionConnectorFilter>,
    pub kind: DataNeedKind,
}

fn default_enabled() -> bool {
    true
}

impl DataNeed {
    /// Inclusive granularity range `[granularity, max_granularity]`.
    #[must_use]
    pub fn granularity_range(&self) -> Option<(Granularity, Granularity)> {
        match &self.kind {
            DataNeedKind::ValidatedHistoricalData {
                granularity,
                max_granularity,
                ..
            } => Some((*granularity, max_granularity.unwrap_or(*granularity))),
            DataNeedKind::AccountingPoint => None,
        }
    }

    #[must_use]
    pub fn energy_type(&self) -> Option<EnergyType> {
        match &self.kind {
            DataNeedKind::ValidatedHistoricalData { energy_type, .. } => Some(*energy_type),
            DataNeedKind::AccountingPoint => None,
        }
    }

    #[must_use]
    pub fn is_accounting_point(&self) -> bool {
        matches!(self.kind, DataNeedKind::AccountingPoint)
    }
}

// =============================================================================
// RULES
// =============================================================================

/// A single capability statement of an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataNeedRule {
    /// Accounting-point data can be provided unconditionally.
    AccountingPoint,
    ValidatedHistoricalData {
        energy_type: EnergyType,
        granularities: Vec<Granularity>,
    },
    /// The adapter accepts several data needs in one permission request.
    AllowMultipleDataNeeds,
}

impl DataNeedRule {
    #[must_use]
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            Self::AccountingPoint => Some("account"),
            Self::ValidatedHistoricalData { .. } => Some("validated"),
            Self::AllowMultipleDataNeeds => None,
        }
    }
}

/// All rules one adapter exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataNeedRuleSet {
    pub rules: Vec<DataNeedRule>,
}

impl DataNeedRuleSet {
    #[must_use]
    pub fn new(rules: Vec<DataNeedRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn allows_multiple(&self) -> bool {
        self.rules.contains(&DataNeedRule::AllowMultipleDataNeeds)
    }

    /// Distinct data-need type names the rules cover, in rule order.
    #[must_use]
    pub fn supported_type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for name in self.rules.iter().filter_map(DataNeedRule::type_name) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_granularity_order() {
        assert!(Granularity::PT15M < Granularity::PT1H);
        assert!(Granularity::P1D < Granularity::P1Y);
        let mut shuffled = vec![Granularity::P1D, Granularity::PT5M, Granularity::PT30M];
        shuffled.sort();
        assert_eq!(shuffled, vec![Granularity::PT5M, Granularity::PT30M, Granularity::P1D]);
    }

    #[test]
    fn test_period_apply() {
        assert_eq!(Period::days(-10).apply(date(2024, 3, 5)), Some(date(2024, 2, 24)));
        assert_eq!(Period::months(-1).apply(date(2024, 3, 31)), Some(date(2024, 2, 29)));
        let mixed = Period { months: 1, days: 1 };
        assert_eq!(mixed.apply(date(2024, 1, 31)), Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_filter_permits() {
        let allow = RegionConnectorFilter {
            filter_type: RegionConnectorFilterType::Allowlist,
            region_connector_ids: vec![RegionConnectorId::new("at-eda")],
        };
        assert!(allow.permits(&RegionConnectorId::new("at-eda")));
        assert!(!allow.permits(&RegionConnectorId::new("dk-energinet")));

        let block = RegionConnectorFilter {
            filter_type: RegionConnectorFilterType::Blocklist,
            ..allow
        };
        assert!(!block.permits(&RegionConnectorId::new("at-eda")));
        assert!(block.permits(&RegionConnectorId::new("dk-energinet")));
    }

    #[test]
    fn test_granularity_range_without_max() {
        let need = DataNeed {
            id: DataNeedId::new("dn"),
            name: "15 min".into(),
            enabled: true,
            region_connector_filter: None,
            kind: DataNeedKind::ValidatedHistoricalData {
                energy_type: EnergyType::Electricity,
                granularity: Granularity::PT15M,
                max_granularity: None,
                duration: DataNeedDuration::Relative {
                    start: Some(Period::days(-10)),
                    end: None,
                },
            },
        };
        assert_eq!(
            need.granularity_range(),
            Some((Granularity::PT15M, Granularity::PT15M))
        );
    }

    #[test]
    fn test_supported_type_names_are_distinct() {
        let rules = DataNeedRuleSet::new(vec![
            DataNeedRule::ValidatedHistoricalData {
                energy_type: EnergyType::Electricity,
                granularities: vec![Granularity::PT15M],
            },
            DataNeedRule::ValidatedHistoricalData {
                energy_type: EnergyType::NaturalGas,
                granularities: vec![Granularity::P1D],
            },
            DataNeedRule::AccountingPoint,
            DataNeedRule::AllowMultipleDataNeeds,
        ]);
        assert_eq!(rules.supported_type_names(), vec!["validated", "account"]);
        assert!(rules.allows_multiple());
    }
}
