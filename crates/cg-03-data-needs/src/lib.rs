//! # Data Need Rule Engine (cg-03)
//!
//! Decides whether and how an adapter can serve a data need.
//!
//! - [`matches`] - a single rule against a single need
//! - [`DataNeedMatcher`] - every registered adapter against a need
//! - [`DataNeedCalculationService`] - full evaluation for one adapter,
//!   including granularities and permission/energy timeframes
//!
//! Timeframe policy is pluggable through [`EnergyDataTimeframeStrategy`] and
//! [`PermissionTimeframeStrategy`].

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod matcher;
pub mod ports;
pub mod service;

pub use adapters::InMemoryDataNeedCatalog;
pub use domain::{
    matches, supported_granularities, CapabilityError, DataNeedCalculation,
    DefaultEnergyDataTimeframeStrategy, EnergyDataTimeframeStrategy, LookAheadStrategy,
    MultipleDataNeedCalculation, PastOrFutureStrategy, PermissionEndIsEnergyDataEndStrategy,
    PermissionTimeframeStrategy, TimeframeBounds,
};
pub use matcher::DataNeedMatcher;
pub use ports::DataNeedCatalog;
pub use service::DataNeedCalculationService;
