use serde::{Deserialize, Serialize};
use shared_types::{DocumentKind, DocumentStreamKey, SchemaVersion};
use std::time::Duration;

/// Broker settings shared by every stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Trailing window replay subscribers receive on join.
    pub replay_window_secs: u64,
    /// Upper bound of buffered envelopes per stream, whatever the window.
    pub replay_capacity: usize,
    /// Live buffer per stream before slow consumers lose envelopes.
    pub channel_capacity: usize,
    /// Streams created at startup.
    pub streams: Vec<DocumentStreamKey>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            replay_window_secs: 10,
            replay_capacity: 1000,
            channel_capacity: 1000,
            streams: vec![
                DocumentStreamKey::new(DocumentKind::ValidatedHistoricalData, SchemaVersion::new("1.04")),
                DocumentStreamKey::new(DocumentKind::AccountingPointData, SchemaVersion::new("1.04")),
                DocumentStreamKey::new(DocumentKind::PermissionMarketDocument, SchemaVersion::new("1.04")),
                DocumentStreamKey::new(DocumentKind::RawData, SchemaVersion::new("1.0")),
            ],
        }
    }
}

impl BrokerConfig {
    #[must_use]
    pub fn replay_window(&self) -> Duration {
        Duration::from_secs(self.replay_window_secs)
    }
}
