//! Results of evaluating data needs against one adapter.

use serde::{Deserialize, Serialize};
use shared_types::{DataNeedId, Granularity, Timeframe};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome for a single data need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DataNeedCalculation {
    NotFound,
    NotSupported {
        message: String,
    },
    ValidatedHistoricalData {
        /// Supported granularities in the requested range, finest first.
        granularities: Vec<Granularity>,
        permission_timeframe: Timeframe,
        energy_timeframe: Timeframe,
    },
    AccountingPoint {
        permission_timeframe: Timeframe,
    },
}

impl DataNeedCalculation {
    pub(crate) fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            Self::ValidatedHistoricalData { .. } | Self::AccountingPoint { .. }
        )
    }

    #[must_use]
    pub fn permission_timeframe(&self) -> Option<Timeframe> {
        match self {
            Self::ValidatedHistoricalData {
                permission_timeframe,
                ..
            }
            | Self::AccountingPoint {
                permission_timeframe,
            } => Some(*permission_timeframe),
            Self::NotFound | Self::NotSupported { .. } => None,
        }
    }
}

/// Outcome for several data needs requested together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MultipleDataNeedCalculation {
    Results {
        results: BTreeMap<DataNeedId, DataNeedCalculation>,
    },
    InvalidCombination {
        data_need_ids: BTreeSet<DataNeedId>,
        message: String,
    },
}
