//! # Calendar Aggregation
//!
//! Groups tide observations by calendar month, or by `(year, month)`, and
//! computes mean heights. Every table carries the English month name generated
//! from the month number, so output never depends on the host locale.
//!
//! Only months present in the input produce a row. Groups are kept in
//! `BTreeMap`s, which fixes the output order (month, or year then month) no
//! matter how the input was ordered.

use crate::config::DayWindow;
use crate::error::Result;
use crate::export::{export_to_csv, TableRow};
use crate::{ObservationSeries, TideObservation};
use chrono::Month;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Mean tide height for one calendar month across all years.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlyMean {
    pub month: u32,
    pub mean_value: f64,
    pub month_name: String,
}

impl TableRow for MonthlyMean {
    const COLUMNS: &'static [&'static str] = &["month", "mean_value", "month_name"];
}

/// Mean daytime lowest tide for one calendar month across all years.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DaytimeMonthlyMean {
    pub month: u32,
    pub average_lowest_tide: f64,
    pub month_name: String,
}

impl TableRow for DaytimeMonthlyMean {
    const COLUMNS: &'static [&'static str] = &["month", "average_lowest_tide", "month_name"];
}

/// Mean daytime lowest tide for one month of one year.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct YearMonthMean {
    pub year: i32,
    pub month: u32,
    pub average_lowest_tide: f64,
    pub month_name: String,
}

impl TableRow for YearMonthMean {
    const COLUMNS: &'static [&'static str] =
        &["year", "month", "average_lowest_tide", "month_name"];
}

/// English full month name for a 1-12 month number.
///
/// Out-of-range numbers yield an empty string; grouping keys always come from
/// `chrono` timestamps so this does not happen in practice.
pub fn month_name(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .unwrap_or_default()
}

/// Running sum and count for an arithmetic mean.
#[derive(Clone, Copy, Debug, Default)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

fn group_means<K, F>(series: &ObservationSeries, key: F) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&TideObservation) -> K,
{
    let mut groups: BTreeMap<K, MeanAccumulator> = BTreeMap::new();
    for obs in series {
        groups.entry(key(obs)).or_default().push(obs.value);
    }
    groups
        .into_iter()
        .map(|(k, acc)| (k, acc.mean()))
        .collect()
}

/// Average tide per calendar month, ignoring the year.
pub fn monthly_mean(series: &ObservationSeries) -> Vec<MonthlyMean> {
    group_means(series, |obs| obs.month())
        .into_iter()
        .map(|(month, mean_value)| MonthlyMean {
            month,
            mean_value,
            month_name: month_name(month),
        })
        .collect()
}

/// Average tide per calendar month, restricted to observations whose hour
/// falls inside `window`.
///
/// Returns an empty table when nothing falls inside the window.
pub fn daytime_monthly_mean(
    series: &ObservationSeries,
    window: DayWindow,
) -> Vec<DaytimeMonthlyMean> {
    let daytime = series.filter(|obs| window.contains(obs.hour()));
    if daytime.is_empty() {
        warn!(
            "No tides found between {}:00 and {}:00 ({:?} end)",
            window.start_hour, window.end_hour, window.end
        );
        return Vec::new();
    }

    group_means(&daytime, |obs| obs.month())
        .into_iter()
        .map(|(month, average_lowest_tide)| DaytimeMonthlyMean {
            month,
            average_lowest_tide,
            month_name: month_name(month),
        })
        .collect()
}

/// Average daytime tide per `(year, month)`, sorted by year then month.
pub fn compute_yearly_monthly_mean(
    series: &ObservationSeries,
    window: DayWindow,
) -> Vec<YearMonthMean> {
    let daytime = series.filter(|obs| window.contains(obs.hour()));
    debug!(
        "{} of {} observations inside daytime window",
        daytime.len(),
        series.len()
    );

    group_means(&daytime, |obs| (obs.year(), obs.month()))
        .into_iter()
        .map(|((year, month), average_lowest_tide)| YearMonthMean {
            year,
            month,
            average_lowest_tide,
            month_name: month_name(month),
        })
        .collect()
}

/// Average daytime tide per `(year, month)`, exported to `output` before it is
/// returned.
pub fn yearly_monthly_mean<P: AsRef<Path>>(
    series: &ObservationSeries,
    window: DayWindow,
    output: P,
) -> Result<Vec<YearMonthMean>> {
    let table = compute_yearly_monthly_mean(series, window);
    let outcome = export_to_csv(&table, output)?;
    info!(
        "Exported {} year/month means to {}",
        table.len(),
        outcome.path.display()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowEnd;
    use crate::TideKind;
    use chrono::NaiveDate;

    fn obs(year: i32, month: u32, day: u32, hour: u32, value: f64) -> TideObservation {
        let ts = NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap();
        TideObservation::new(ts, value, Some(TideKind::Low))
    }

    #[test]
    fn month_names_are_english_and_locale_free() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(9), "September");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(13), "");
    }

    #[test]
    fn monthly_mean_ignores_year_and_skips_absent_months() {
        let series = ObservationSeries::new(vec![
            obs(2023, 3, 1, 4, 1.0),
            obs(2024, 3, 9, 4, 2.0),
            obs(2024, 1, 2, 4, -0.5),
            obs(2024, 1, 3, 4, 0.5),
        ]);

        let table = monthly_mean(&series);
        assert_eq!(
            table,
            vec![
                MonthlyMean {
                    month: 1,
                    mean_value: 0.0,
                    month_name: "January".to_string(),
                },
                MonthlyMean {
                    month: 3,
                    mean_value: 1.5,
                    month_name: "March".to_string(),
                },
            ]
        );
    }

    #[test]
    fn monthly_mean_never_exceeds_twelve_rows() {
        let series: ObservationSeries = (2020..2024)
            .flat_map(|year| (1..=12).map(move |month| obs(year, month, 15, 8, month as f64)))
            .collect();
        let table = monthly_mean(&series);
        assert_eq!(table.len(), 12);
        assert_eq!(table[6].mean_value, 7.0);
    }

    #[test]
    fn daytime_mean_uses_inclusive_end_when_configured() {
        let series = ObservationSeries::new(vec![
            obs(2024, 5, 1, 9, -9.0),
            obs(2024, 5, 2, 10, 1.0),
            obs(2024, 5, 3, 16, 2.0),
            obs(2024, 5, 4, 17, -9.0),
        ]);

        let inclusive = daytime_monthly_mean(&series, DayWindow::new(10, 16, WindowEnd::Inclusive));
        assert_eq!(inclusive.len(), 1);
        assert_eq!(inclusive[0].average_lowest_tide, 1.5);

        let exclusive = daytime_monthly_mean(&series, DayWindow::new(10, 16, WindowEnd::Exclusive));
        assert_eq!(exclusive[0].average_lowest_tide, 1.0);
    }

    #[test]
    fn daytime_mean_is_empty_without_daytime_tides() {
        let series = ObservationSeries::new(vec![obs(2024, 5, 1, 3, 0.2)]);
        let table = daytime_monthly_mean(&series, DayWindow::new(10, 16, WindowEnd::Inclusive));
        assert!(table.is_empty());
    }

    #[test]
    fn yearly_means_are_grouped_by_year_and_month() {
        let series = ObservationSeries::new(vec![
            obs(2024, 2, 1, 12, 0.4),
            obs(2023, 2, 1, 12, 0.2),
            obs(2023, 2, 15, 11, 0.6),
            obs(2023, 1, 1, 12, -0.2),
            obs(2023, 1, 2, 22, -5.0),
        ]);

        let table = compute_yearly_monthly_mean(&series, DayWindow::new(10, 16, WindowEnd::Inclusive));
        let keys: Vec<(i32, u32)> = table.iter().map(|r| (r.year, r.month)).collect();
        assert_eq!(keys, vec![(2023, 1), (2023, 2), (2024, 2)]);
        assert_eq!(table[0].average_lowest_tide, -0.2);
        assert!((table[1].average_lowest_tide - 0.4).abs() < 1e-12);
        assert_eq!(table[2].month_name, "February");
    }

    #[test]
    fn yearly_means_are_exported_before_return() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("by_year.csv");
        let series = ObservationSeries::new(vec![obs(2023, 7, 1, 12, 0.25)]);

        let table =
            yearly_monthly_mean(&series, DayWindow::new(10, 16, WindowEnd::Inclusive), &path).unwrap();
        assert_eq!(table.len(), 1);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "year,month,average_lowest_tide,month_name\n2023,7,0.25,July\n"
        );
    }
}
