//! # Consent-Grid Telemetry
//!
//! Logging and metrics for every Consent-Grid component.
//!
//! ## Components
//!
//! - **Logs**: `tracing` with a JSON or human-readable `fmt` layer
//! - **Metrics**: Prometheus counters and histograms in a global registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cg_telemetry::{TelemetryConfig, init_telemetry};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CG_SERVICE_NAME` | `consent-grid` | Service name in logs |
//! | `CG_LOG_LEVEL` | `info` | Log level filter |
//! | `CG_JSON_LOGS` | `false` | JSON log lines |
//! | `CG_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `CG_ENVIRONMENT` | `dev` | Deployment environment |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    gather_metrics, register_metrics, BUS_EVENTS_LAGGED, BUS_EVENTS_PUBLISHED, COMMITS_REJECTED,
    CONSUMER_LAGGED, DOCUMENTS_PUBLISHED, EVENTS_COMMITTED, PERMISSIONS_CREATED,
    PERMISSIONS_RECLAIMED, PRODUCER_ERRORS, RETRANSMISSIONS, SWEEP_DURATION,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize metrics and logging.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first, logging may already report
    register_metrics()?;
    init_logging(config)?;

    Ok(TelemetryGuard {
        service_name: config.service_name.clone(),
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
