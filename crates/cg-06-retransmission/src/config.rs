use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetransmissionConfig {
    /// Upper bound for one connector call before it counts as failed.
    pub timeout_secs: u64,
}

impl Default for RetransmissionConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl RetransmissionConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
