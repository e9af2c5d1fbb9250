//! Domain layer: matching, timeframe strategies, calculation results.

pub mod calculation;
pub mod errors;
pub mod matching;
pub mod timeframe;

pub use calculation::{DataNeedCalculation, MultipleDataNeedCalculation};
pub use errors::CapabilityError;
pub use matching::{matches, supported_granularities};
pub use timeframe::{
    DefaultEnergyDataTimeframeStrategy, EnergyDataTimeframeStrategy, LookAheadStrategy,
    PastOrFutureStrategy, PermissionEndIsEnergyDataEndStrategy, PermissionTimeframeStrategy,
    TimeframeBounds,
};
