//! Prometheus metrics for Consent-Grid components.
//!
//! All metrics follow the naming convention: `cg_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., events_committed_total)
//! - **Histogram**: Distribution of values (e.g., sweep_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // EVENT STORE
    // =========================================================================

    /// Events committed to the ledger, by status
    pub static ref EVENTS_COMMITTED: IntCounterVec = IntCounterVec::new(
        Opts::new("cg_store_events_committed_total", "Permission events committed"),
        &["status"]
    ).expect("metric creation failed");

    /// Commits refused, by reason
    pub static ref COMMITS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("cg_store_commits_rejected_total", "Permission event commits rejected"),
        &["reason"]  // reason: terminal/status_changed/unknown_permission/ledger
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT BUS
    // =========================================================================

    /// Events published on the bus
    pub static ref BUS_EVENTS_PUBLISHED: IntCounter = IntCounter::new(
        "cg_bus_events_published_total",
        "Permission events published on the event bus"
    ).expect("metric creation failed");

    /// Events lost by lagging subscribers
    pub static ref BUS_EVENTS_LAGGED: IntCounter = IntCounter::new(
        "cg_bus_events_lagged_total",
        "Events dropped for subscribers that fell behind the ring buffer"
    ).expect("metric creation failed");

    // =========================================================================
    // RECLAIMER
    // =========================================================================

    /// Permissions moved to TimedOut
    pub static ref PERMISSIONS_RECLAIMED: IntCounter = IntCounter::new(
        "cg_reclaimer_permissions_reclaimed_total",
        "Stale permission requests timed out by the reclaimer"
    ).expect("metric creation failed");

    /// Sweep duration
    pub static ref SWEEP_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "cg_reclaimer_sweep_duration_seconds",
            "Time spent in one stale-request sweep"
        ).buckets(exponential_buckets(0.0001, 2.0, 15).expect("static bucket layout"))
    ).expect("metric creation failed");

    // =========================================================================
    // DOCUMENT BROKER
    // =========================================================================

    /// Documents accepted by a broker
    pub static ref DOCUMENTS_PUBLISHED: IntCounterVec = IntCounterVec::new(
        Opts::new("cg_broker_documents_published_total", "Market documents published"),
        &["stream"]
    ).expect("metric creation failed");

    /// Producer items skipped because they failed
    pub static ref PRODUCER_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("cg_broker_producer_errors_total", "Failed producer items skipped"),
        &["stream"]
    ).expect("metric creation failed");

    /// Documents lost by lagging consumers
    pub static ref CONSUMER_LAGGED: IntCounterVec = IntCounterVec::new(
        Opts::new("cg_broker_consumer_lagged_total", "Documents dropped for lagging consumers"),
        &["stream"]
    ).expect("metric creation failed");

    // =========================================================================
    // RETRANSMISSION
    // =========================================================================

    /// Retransmission requests by adapter and outcome
    pub static ref RETRANSMISSIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("cg_retransmissions_total", "Retransmission requests routed"),
        &["region_connector", "outcome"]
    ).expect("metric creation failed");

    // =========================================================================
    // ORCHESTRATION
    // =========================================================================

    /// Permission requests created, by adapter
    pub static ref PERMISSIONS_CREATED: IntCounterVec = IntCounterVec::new(
        Opts::new("cg_orchestrator_permissions_created_total", "Permission requests created"),
        &["region_connector"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Event store
        Box::new(EVENTS_COMMITTED.clone()),
        Box::new(COMMITS_REJECTED.clone()),
        // Event bus
        Box::new(BUS_EVENTS_PUBLISHED.clone()),
        Box::new(BUS_EVENTS_LAGGED.clone()),
        // Reclaimer
        Box::new(PERMISSIONS_RECLAIMED.clone()),
        Box::new(SWEEP_DURATION.clone()),
        // Broker
        Box::new(DOCUMENTS_PUBLISHED.clone()),
        Box::new(PRODUCER_ERRORS.clone()),
        Box::new(CONSUMER_LAGGED.clone()),
        // Retransmission
        Box::new(RETRANSMISSIONS.clone()),
        // Orchestration
        Box::new(PERMISSIONS_CREATED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
