//! # Timeframe
//!
//! Inclusive date range used for permission validity and energy-data windows.

use crate::errors::TimeframeError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive `[start, end]` date range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeframe")]
pub struct Timeframe {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawTimeframe {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawTimeframe> for Timeframe {
    type Error = TimeframeError;

    fn try_from(raw: RawTimeframe) -> Result<Self, Self::Error> {
        Timeframe::new(raw.start, raw.end)
    }
}

impl Timeframe {
    /// Build a timeframe, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TimeframeError> {
        if start > end {
            return Err(TimeframeError { start, end });
        }
        Ok(Self { start, end })
    }

    /// A single-day timeframe.
    #[must_use]
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` lies inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether `other` lies completely inside this range.
    #[must_use]
    pub fn encloses(&self, other: &Timeframe) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
