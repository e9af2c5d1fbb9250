//! # Timeframe Strategies
//!
//! Two questions are answered separately:
//!
//! - which energy data a need asks for ([`EnergyDataTimeframeStrategy`])
//! - how long the permission must stay valid to deliver it
//!   ([`PermissionTimeframeStrategy`])
//!
//! Adapters pick the pair that fits their administrator.

use super::errors::CapabilityError;
use chrono::{Days, NaiveDate};
use shared_types::{DataNeed, DataNeedDuration, DataNeedKind, Period, RegionConnectorMetadata, Timeframe};

/// The energy-data window an adapter can serve, as absolute dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeframeBounds {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl TimeframeBounds {
    /// Resolve the adapter's relative limits against `today`.
    ///
    /// Offsets that overflow the calendar fall back to `today`.
    #[must_use]
    pub fn for_adapter(metadata: &RegionConnectorMetadata, today: NaiveDate) -> Self {
        Self {
            earliest: metadata.earliest_start.apply(today).unwrap_or(today),
            latest: metadata.latest_end.apply(today).unwrap_or(today),
        }
    }
}

// =============================================================================
// ENERGY DATA TIMEFRAME
// =============================================================================

pub trait EnergyDataTimeframeStrategy: Send + Sync {
    /// The requested energy-data window, or `None` if the need carries none.
    fn energy_data_timeframe(
        &self,
        need: &DataNeed,
        today: NaiveDate,
        bounds: TimeframeBounds,
    ) -> Result<Option<Timeframe>, CapabilityError>;
}

/// Relative durations are resolved against today and clipped to the bounds.
/// Absolute durations must already lie inside the bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEnergyDataTimeframeStrategy;

impl EnergyDataTimeframeStrategy for DefaultEnergyDataTimeframeStrategy {
    fn energy_data_timeframe(
        &self,
        need: &DataNeed,
        today: NaiveDate,
        bounds: TimeframeBounds,
    ) -> Result<Option<Timeframe>, CapabilityError> {
        let duration = match &need.kind {
            DataNeedKind::AccountingPoint => return Ok(None),
            DataNeedKind::ValidatedHistoricalData { duration, .. } => duration,
        };

        let (start, end) = match *duration {
            DataNeedDuration::Relative { start, end } => {
                let resolve = |offset: Option<Period>, fallback: NaiveDate| match offset {
                    Some(period) => period.apply(today).ok_or_else(|| {
                        CapabilityError::unsupported(&need.id, "Relative duration overflows the calendar")
                    }),
                    None => Ok(fallback),
                };
                let start = resolve(start, bounds.earliest)?.max(bounds.earliest);
                let end = resolve(end, bounds.latest)?.min(bounds.latest);
                (start, end)
            }
            DataNeedDuration::Absolute { start, end } => {
                if start < bounds.earliest || end > bounds.latest {
                    return Err(CapabilityError::unsupported(
                        &need.id,
                        format!(
                            "Requested timeframe [{start}, {end}] exceeds the supported range [{}, {}]",
                            bounds.earliest, bounds.latest
                        ),
                    ));
                }
                (start, end)
            }
        };

        Timeframe::new(start, end).map(Some).map_err(|_| {
            CapabilityError::unsupported(
                &need.id,
                "Requested timeframe lies outside of the supported range",
            )
        })
    }
}

/// Like [`DefaultEnergyDataTimeframeStrategy`], but the window must lie
/// entirely before today or entirely from today on.
#[derive(Debug, Clone, Copy, Default)]
pub struct PastOrFutureStrategy {
    inner: DefaultEnergyDataTimeframeStrategy,
}

impl EnergyDataTimeframeStrategy for PastOrFutureStrategy {
    fn energy_data_timeframe(
        &self,
        need: &DataNeed,
        today: NaiveDate,
        bounds: TimeframeBounds,
    ) -> Result<Option<Timeframe>, CapabilityError> {
        let timeframe = self.inner.energy_data_timeframe(need, today, bounds)?;
        if let Some(tf) = timeframe {
            let past = tf.end() < today;
            let future = tf.start() >= today;
            if !past && !future {
                return Err(CapabilityError::unsupported(
                    &need.id,
                    "Energy data must lie either completely in the past or completely in the future",
                ));
            }
        }
        Ok(timeframe)
    }
}

// =============================================================================
// PERMISSION TIMEFRAME
// =============================================================================

pub trait PermissionTimeframeStrategy: Send + Sync {
    fn permission_timeframe(&self, energy: Option<&Timeframe>, today: NaiveDate) -> Timeframe;
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// Validity runs one day past the last requested day, at least until
/// tomorrow.
#[derive(Debug, Clone, Copy, Default)]
pub struct LookAheadStrategy;

impl PermissionTimeframeStrategy for LookAheadStrategy {
    fn permission_timeframe(&self, energy: Option<&Timeframe>, today: NaiveDate) -> Timeframe {
        let end = match energy {
            Some(tf) if tf.end() > today => next_day(tf.end()),
            _ => next_day(today),
        };
        Timeframe::new(today, end).unwrap_or_else(|_| Timeframe::day(today))
    }
}

/// Validity ends with the energy data, never before today.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionEndIsEnergyDataEndStrategy;

impl PermissionTimeframeStrategy for PermissionEndIsEnergyDataEndStrategy {
    fn permission_timeframe(&self, energy: Option<&Timeframe>, today: NaiveDate) -> Timeframe {
        let end = energy.map_or(today, |tf| tf.end().max(today));
        Timeframe::new(today, end).unwrap_or_else(|_| Timeframe::day(today))
    }
}
