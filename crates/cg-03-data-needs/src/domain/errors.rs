use shared_types::DataNeedId;
use thiserror::Error;

/// A data need cannot be served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// No registered adapter has a matching rule.
    #[error("{message}")]
    NoAdapterSupports {
        data_need_id: DataNeedId,
        message: String,
    },

    /// An adapter policy refuses the need.
    #[error("Data need {data_need_id} not supported: {reason}")]
    UnsupportedDataNeed {
        data_need_id: DataNeedId,
        reason: String,
    },
}

impl CapabilityError {
    pub(crate) fn unsupported(data_need_id: &DataNeedId, reason: impl Into<String>) -> Self {
        Self::UnsupportedDataNeed {
            data_need_id: data_need_id.clone(),
            reason: reason.into(),
        }
    }
}
