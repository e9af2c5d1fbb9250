//! # Consent-Grid
//!
//! Loads configuration, initializes telemetry, starts the runtime and runs
//! until Ctrl+C.
//!
//! Configuration comes from the TOML file named by `CG_CONFIG` (defaults
//! apply when unset), then `CG_*` environment overrides.

use anyhow::{Context, Result};
use cg_runtime::{ConsentGrid, RuntimeConfig};
use cg_telemetry::init_telemetry;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::load().context("Failed to load configuration")?;
    let _telemetry = init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Consent-Grid v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let runtime = ConsentGrid::build(config).context("Failed to build runtime")?;
    runtime.start().context("Failed to start runtime")?;

    info!("Consent-Grid is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
