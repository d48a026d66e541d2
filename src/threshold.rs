//! # Tidepool Threshold Counts
//!
//! Answers "in a typical January, how many daytime tides drop below the
//! tidepool threshold?" The result always has twelve rows, one per calendar
//! month in order, with months that never qualified reported as zero.

use crate::aggregate::month_name;
use crate::config::DayWindow;
use crate::error::Result;
use crate::export::{export_to_csv, TableRow};
use crate::ObservationSeries;
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Average number of qualifying daytime tides in one calendar month.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThresholdCount {
    pub month: u32,
    pub average_count_below_threshold: f64,
    pub month_name: String,
}

impl TableRow for ThresholdCount {
    const COLUMNS: &'static [&'static str] =
        &["month", "average_count_below_threshold", "month_name"];
}

/// Per-month average count of observations below `threshold` whose hour is in
/// `window`.
///
/// Counts are taken per `(year, month)`, then averaged over the years that had
/// at least one qualifying observation in that month. Months with none are
/// zero-filled.
pub fn compute_threshold_counts(
    series: &ObservationSeries,
    threshold: f64,
    window: DayWindow,
) -> Vec<ThresholdCount> {
    let mut per_year_month: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for obs in series
        .iter()
        .filter(|obs| obs.value < threshold)
        .filter(|obs| window.contains(obs.hour()))
    {
        *per_year_month.entry((obs.year(), obs.month())).or_default() += 1;
    }
    debug!(
        "{} year/month groups with tides below {}",
        per_year_month.len(),
        threshold
    );

    let mut per_month: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for ((_, month), count) in per_year_month {
        per_month.entry(month).or_default().push(count);
    }

    (1..=12)
        .map(|month| {
            let average = per_month
                .get(&month)
                .map(|counts| counts.iter().sum::<usize>() as f64 / counts.len() as f64)
                .unwrap_or(0.0);
            ThresholdCount {
                month,
                average_count_below_threshold: average,
                month_name: month_name(month),
            }
        })
        .collect()
}

/// Compute the twelve-row threshold table and export it to `output` before
/// returning it.
pub fn count_below_threshold<P: AsRef<Path>>(
    series: &ObservationSeries,
    threshold: f64,
    window: DayWindow,
    output: P,
) -> Result<Vec<ThresholdCount>> {
    let table = compute_threshold_counts(series, threshold, window);
    let outcome = export_to_csv(&table, output)?;
    info!(
        "Exported tidepool counts below {} to {}",
        threshold,
        outcome.path.display()
    );
    Ok(table)
}
