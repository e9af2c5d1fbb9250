//! # Runtime Configuration
//!
//! One TOML document with a section per component. Every field has a default,
//! so an empty file (or no file at all) yields a working in-memory setup with
//! one simulation connector.
//!
//! ## Sources, later wins
//!
//! 1. built-in defaults
//! 2. the TOML file named by `CG_CONFIG`
//! 3. environment overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `CG_EVENT_LOG` | `event_store.path`, switches the backend to `file` |
//! | `CG_SWEEP_INTERVAL_SECS` | `reclaimer.interval_secs` |
//! | `CG_STALE_THRESHOLD_HOURS` | `reclaimer.stale_after_hours` |
//! | `CG_REPLAY_WINDOW_SECS` | `broker.replay_window_secs` |
//! | `CG_BUS_CAPACITY` | `bus.capacity` |

use cg_04_stale_reclaimer::ReclaimerConfig;
use cg_05_document_broker::BrokerConfig;
use cg_06_retransmission::RetransmissionConfig;
use cg_telemetry::TelemetryConfig;
use serde::Deserialize;
use shared_types::{DataNeed, RegionConnectorId};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    #[error("Invalid config: {0}")]
    Parse(String),

    #[error("Invalid value {value:?} for {key}")]
    InvalidOverride { key: &'static str, value: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub bus: BusConfig,
    pub event_store: EventStoreConfig,
    pub reclaimer: ReclaimerConfig,
    pub broker: BrokerConfig,
    pub retransmission: RetransmissionConfig,
    pub telemetry: TelemetryConfig,
    pub adapters: Vec<AdapterConfig>,
    /// Data needs loaded into the catalog at startup.
    pub data_needs: Vec<DataNeed>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            event_store: EventStoreConfig::default(),
            reclaimer: ReclaimerConfig::default(),
            broker: BrokerConfig::default(),
            retransmission: RetransmissionConfig::default(),
            telemetry: TelemetryConfig::default(),
            adapters: vec![AdapterConfig::default()],
            data_needs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Events buffered per subscriber before the oldest are dropped.
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventStoreConfig {
    pub backend: LedgerBackend,
    /// Ledger file, used by the `file` backend.
    pub path: PathBuf,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Memory,
            path: PathBuf::from("./data/events.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    #[default]
    Simulation,
}

/// One region connector to start.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub id: RegionConnectorId,
    pub kind: AdapterKind,
    pub enabled: bool,
    /// ISO 3166-1 alpha-2 code.
    pub country_code: String,
    /// Simulation only: accept every request right after it was sent.
    pub auto_accept: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            id: RegionConnectorId::new("sim"),
            kind: AdapterKind::Simulation,
            enabled: true,
            country_code: "AT".to_string(),
            auto_accept: true,
        }
    }
}

impl RuntimeConfig {
    /// Defaults, then `CG_CONFIG`, then environment overrides.
    ///
    /// # Errors
    ///
    /// Unreadable or invalid file, unparseable override, or a config that
    /// fails [`Self::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("CG_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.telemetry = config.telemetry.with_env_overrides();
        let config = config.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// `ConfigError::Read` or `ConfigError::Parse`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        contents.parse()
    }

    /// Apply the `CG_*` overrides found through `lookup`.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidOverride` if a numeric variable does not parse.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("CG_EVENT_LOG") {
            self.event_store.backend = LedgerBackend::File;
            self.event_store.path = PathBuf::from(path);
        }
        if let Some(secs) = parse_override(&lookup, "CG_SWEEP_INTERVAL_SECS")? {
            self.reclaimer.interval_secs = secs;
        }
        if let Some(hours) = parse_override(&lookup, "CG_STALE_THRESHOLD_HOURS")? {
            self.reclaimer.stale_after_hours = hours;
        }
        if let Some(secs) = parse_override(&lookup, "CG_REPLAY_WINDOW_SECS")? {
            self.broker.replay_window_secs = secs;
        }
        if let Some(capacity) = parse_override(&lookup, "CG_BUS_CAPACITY")? {
            self.bus.capacity = capacity;
        }
        Ok(self)
    }

    /// # Errors
    ///
    /// `ConfigError::Invalid` on zero capacities or duplicate adapter ids.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.capacity == 0 {
            return Err(ConfigError::Invalid("bus.capacity must be positive".into()));
        }
        if self.broker.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "broker.channel_capacity must be positive".into(),
            ));
        }
        let mut seen = HashSet::new();
        for adapter in &self.adapters {
            if !seen.insert(&adapter.id) {
                return Err(ConfigError::Invalid(format!(
                    "adapter {} configured twice",
                    adapter.id
                )));
            }
        }
        Ok(())
    }

    /// Adapters with `enabled = true`.
    pub fn enabled_adapters(&self) -> impl Iterator<Item = &AdapterConfig> {
        self.adapters.iter().filter(|a| a.enabled)
    }
}

impl FromStr for RuntimeConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

fn parse_override<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidOverride { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{DataNeedId, DataNeedKind, DocumentKind};
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.bus.capacity, 1024);
        assert_eq!(config.event_store.backend, LedgerBackend::Memory);
        assert_eq!(config.reclaimer.stale_after_hours, 24);
        assert_eq!(config.broker.replay_window_secs, 10);
        assert_eq!(config.adapters.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        let config: RuntimeConfig = "".parse().unwrap();
        assert_eq!(config.bus, BusConfig::default());
        assert_eq!(config.adapters, vec![AdapterConfig::default()]);
    }

    #[test]
    fn test_parse_sections() {
        let config: RuntimeConfig = r#"
            [bus]
            capacity = 64

            [event_store]
            backend = "file"
            path = "/var/lib/cg/events.jsonl"

            [reclaimer]
            interval_secs = 60
            sweepable = ["CREATED", "VALIDATED"]

            [broker]
            replay_window_secs = 30

            [[broker.streams]]
            kind = "raw_data"
            version = "1.0"

            [[adapters]]
            id = "sim-at"
            country_code = "AT"

            [[adapters]]
            id = "sim-dk"
            country_code = "DK"
            enabled = false

            [[data_needs]]
            id = "ap"
            name = "Accounting point"
            kind = { type = "accounting_point" }
        "#
        .parse()
        .unwrap();

        assert_eq!(config.bus.capacity, 64);
        assert_eq!(config.event_store.backend, LedgerBackend::File);
        assert_eq!(config.reclaimer.interval_secs, 60);
        assert_eq!(config.reclaimer.sweepable.len(), 2);
        assert_eq!(config.broker.streams.len(), 1);
        assert_eq!(config.broker.streams[0].kind, DocumentKind::RawData);
        assert_eq!(config.broker.channel_capacity, 1000);
        assert_eq!(config.enabled_adapters().count(), 1);
        assert_eq!(config.data_needs[0].id, DataNeedId::new("ap"));
        assert_eq!(config.data_needs[0].kind, DataNeedKind::AccountingPoint);
        assert!(config.data_needs[0].enabled);
    }

    #[test]
    fn test_env_overrides() {
        let config = RuntimeConfig::default()
            .with_env_overrides(env(&[
                ("CG_EVENT_LOG", "/tmp/cg.jsonl"),
                ("CG_SWEEP_INTERVAL_SECS", "5"),
                ("CG_STALE_THRESHOLD_HOURS", "48"),
                ("CG_REPLAY_WINDOW_SECS", "2"),
                ("CG_BUS_CAPACITY", " 16 "),
            ]))
            .unwrap();

        assert_eq!(config.event_store.backend, LedgerBackend::File);
        assert_eq!(config.event_store.path, PathBuf::from("/tmp/cg.jsonl"));
        assert_eq!(config.reclaimer.interval_secs, 5);
        assert_eq!(config.reclaimer.stale_after_hours, 48);
        assert_eq!(config.broker.replay_window_secs, 2);
        assert_eq!(config.bus.capacity, 16);
    }

    #[test]
    fn test_bad_override_is_reported() {
        let err = RuntimeConfig::default()
            .with_env_overrides(env(&[("CG_BUS_CAPACITY", "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride { key: "CG_BUS_CAPACITY", .. }
        ));
    }

    #[test]
    fn test_duplicate_adapters_rejected() {
        let mut config = RuntimeConfig::default();
        config.adapters.push(AdapterConfig::default());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cg.toml");
        std::fs::write(&path, "[bus]\ncapacity = 8\n").unwrap();
        assert_eq!(RuntimeConfig::from_file(&path).unwrap().bus.capacity, 8);

        let missing = RuntimeConfig::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
