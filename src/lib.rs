//! # Tidal Variance Core Library
//!
//! This library turns a batch of NOAA high/low tide observations into monthly
//! tidal-variance reports for a single coastal station.
//!
//! ## Design Philosophy
//!
//! ### Batch, Not Stream
//! - **Bounded input**: a few years of twice-daily extrema is low thousands of rows
//! - **Immutable series**: every stage consumes an [`ObservationSeries`] and returns
//!   a fresh series or table; nothing is updated in place
//! - **Explicit configuration**: station, daytime windows and thresholds travel in a
//!   [`config::Config`] value handed to each entry point
//!
//! ### Data Flow
//! 1. **Acquire**: read a CSV export or fetch NOAA CO-OPS hilo data ([`tide_data`])
//! 2. **Detect**: keep lower-low tides only ([`extrema`])
//! 3. **Aggregate**: monthly and year×month means ([`aggregate`])
//! 4. **Count**: daytime tides below the tidepool threshold ([`threshold`])
//! 5. **Export**: CSV tables with backup rotation ([`export`]) and charts ([`plotting`])
//!
//! ## Core Types
//! - [`TideKind`]: high or low tide marker as reported by NOAA
//! - [`TideObservation`]: one timestamped tide height
//! - [`ObservationSeries`]: time-ordered observations

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod extrema;
pub mod pipeline;
pub mod plotting;
pub mod renderer;
pub mod threshold;
pub mod tide_data;

pub use error::TideError;

/// Which side of the tidal cycle an observation belongs to.
///
/// NOAA hilo products tag each point as `H`/`HH` (high, higher high) or
/// `L`/`LL` (low, lower low). Both spellings map onto the same kind; the
/// lower-low classification is recomputed by [`extrema`] rather than trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TideKind {
    High,
    Low,
}

impl TideKind {
    /// Single-letter token written to CSV exports.
    pub fn token(self) -> &'static str {
        match self {
            TideKind::High => "H",
            TideKind::Low => "L",
        }
    }
}

impl fmt::Display for TideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for TideKind {
    type Err = TideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "H" | "HH" | "HIGH" => Ok(TideKind::High),
            "L" | "LL" | "LOW" => Ok(TideKind::Low),
            _ => Err(TideError::InvalidKind(s.to_string())),
        }
    }
}

/// A single tide height at a station-local civil time.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use tidal_variance_lib::{TideKind, TideObservation};
///
/// let ts = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_hms_opt(10, 5, 0).unwrap();
/// let low = TideObservation::new(ts, -0.043, Some(TideKind::Low));
///
/// assert_eq!(low.month(), 1);
/// assert_eq!(low.hour(), 10);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideObservation {
    /// Station-local timestamp (NOAA `lst_ldt`)
    pub timestamp: NaiveDateTime,
    /// Tide height in the run's configured unit (feet or meters)
    pub value: f64,
    /// High/low marker; absent for pre-filtered series
    pub kind: Option<TideKind>,
}

impl TideObservation {
    pub fn new(timestamp: NaiveDateTime, value: f64, kind: Option<TideKind>) -> Self {
        TideObservation {
            timestamp,
            value,
            kind,
        }
    }

    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

    /// Calendar month, 1-12
    pub fn month(&self) -> u32 {
        self.timestamp.month()
    }

    /// Hour of day, 0-23
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Time-ordered collection of tide observations.
///
/// Construction sorts by timestamp with a stable sort, so observations sharing
/// a timestamp keep their input order. The series is never mutated afterwards;
/// filters return new series.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<TideObservation>", into = "Vec<TideObservation>")]
pub struct ObservationSeries {
    observations: Vec<TideObservation>,
}

impl ObservationSeries {
    pub fn new(mut observations: Vec<TideObservation>) -> Self {
        observations.sort_by_key(|obs| obs.timestamp);
        ObservationSeries { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TideObservation> {
        self.observations.iter()
    }

    pub fn as_slice(&self) -> &[TideObservation] {
        &self.observations
    }

    /// Tide heights in time order.
    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|obs| obs.value).collect()
    }

    /// New series holding the observations that satisfy `predicate`.
    pub fn filter<P>(&self, mut predicate: P) -> ObservationSeries
    where
        P: FnMut(&TideObservation) -> bool,
    {
        ObservationSeries {
            observations: self
                .observations
                .iter()
                .filter(|obs| predicate(obs))
                .cloned()
                .collect(),
        }
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.observations.first().map(|obs| obs.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.observations.last().map(|obs| obs.timestamp)
    }

    /// Calendar years spanned by the series, `None` when empty.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        Some((
            self.first_timestamp()?.year(),
            self.last_timestamp()?.year(),
        ))
    }
}

impl From<Vec<TideObservation>> for ObservationSeries {
    fn from(observations: Vec<TideObservation>) -> Self {
        ObservationSeries::new(observations)
    }
}

impl From<ObservationSeries> for Vec<TideObservation> {
    fn from(series: ObservationSeries) -> Self {
        series.observations
    }
}

impl FromIterator<TideObservation> for ObservationSeries {
    fn from_iter<I: IntoIterator<Item = TideObservation>>(iter: I) -> Self {
        ObservationSeries::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ObservationSeries {
    type Item = &'a TideObservation;
    type IntoIter = std::slice::Iter<'a, TideObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}
