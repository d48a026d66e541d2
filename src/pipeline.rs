//! # Report Pipeline
//!
//! Runs the full analysis over one observation series:
//!
//! 1. Identify lower-low tides
//! 2. Export the detailed lower-low table
//! 3. Monthly mean → export → plot
//! 4. Daytime monthly mean → export → plot
//! 5. Year×month daytime mean → export → plot
//! 6. Tidepool threshold counts → export → plot
//!
//! Steps 2-6 are independent reports. A failing report is logged and recorded
//! in the returned [`AnalysisSummary`]; the remaining reports still run.

use crate::aggregate::{daytime_monthly_mean, monthly_mean, yearly_monthly_mean, YearMonthMean};
use crate::config::Config;
use crate::error::Result;
use crate::export::{append_period_to_filename, build_period_suffix, export_to_csv};
use crate::extrema::identify_low_tides;
use crate::plotting::{
    plot_daytime_monthly_mean, plot_monthly_mean, plot_threshold_counts, plot_yearly_monthly_mean,
};
use crate::renderer::draw_ascii;
use crate::threshold::count_below_threshold;
use crate::tide_data::to_records;
use crate::ObservationSeries;
use log::{error, info, warn};
use std::path::PathBuf;

/// Base names of the processed tables and charts (period suffix is appended)
pub const DETAILED_LOW_TIDES: &str = "detailed_low_tide_data";
pub const MONTHLY_MEAN: &str = "monthly_low_tide_average";
pub const DAYTIME_MONTHLY_MEAN: &str = "average_lowest_daytime_tide_per_month";
pub const YEARLY_MONTHLY_MEAN: &str = "monthly_avg_lowest_tide_by_year";
pub const THRESHOLD_COUNTS: &str = "monthly_avg_count_below_tidepool_daytime";

/// Inclusive range of calendar years covered by a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisPeriod {
    pub start_year: i32,
    pub end_year: i32,
}

impl AnalysisPeriod {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        AnalysisPeriod {
            start_year,
            end_year,
        }
    }

    /// Years spanned by `series`, or the configured default range when the
    /// series is empty.
    pub fn from_series(series: &ObservationSeries, config: &Config) -> Self {
        match series.year_range() {
            Some((start, end)) => AnalysisPeriod::new(start, end),
            None => AnalysisPeriod::new(
                config.analysis.default_start_year,
                config.analysis.default_end_year,
            ),
        }
    }

    /// File name label, e.g. `2019_2024`
    pub fn suffix(&self) -> String {
        build_period_suffix(self.start_year, self.end_year)
    }
}

/// How charts are produced for each report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlotMode {
    /// SVG files under the configured plots directory
    Svg,
    /// Bar charts printed to stdout
    Terminal,
    /// Tables only
    Off,
}

/// Result of one report step.
#[derive(Debug)]
pub struct ReportOutcome {
    pub name: &'static str,
    /// Path of the exported table, or the error that stopped the report
    pub output: std::result::Result<PathBuf, String>,
}

/// What a pipeline run produced.
#[derive(Debug, Default)]
pub struct AnalysisSummary {
    /// Number of lower-low tides identified
    pub lower_low_count: usize,
    pub reports: Vec<ReportOutcome>,
}

impl AnalysisSummary {
    pub fn failures(&self) -> impl Iterator<Item = &ReportOutcome> {
        self.reports.iter().filter(|r| r.output.is_err())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    fn record<F>(&mut self, name: &'static str, report: F)
    where
        F: FnOnce() -> Result<PathBuf>,
    {
        let output = match report() {
            Ok(path) => Ok(path),
            Err(e) => {
                error!("Report {} failed: {}", name, e);
                Err(e.to_string())
            }
        };
        self.reports.push(ReportOutcome { name, output });
    }
}

fn month_bars<'a, I>(rows: I) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    rows.into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

fn draw_yearly_ascii(rows: &[YearMonthMean], title: &str) {
    let mut years: Vec<i32> = rows.iter().map(|r| r.year).collect();
    years.dedup();
    for year in years {
        let bars = month_bars(
            rows.iter()
                .filter(|r| r.year == year)
                .map(|r| (r.month_name.as_str(), r.average_lowest_tide)),
        );
        draw_ascii(&format!("{} ({})", title, year), &bars);
    }
}

/// Analyse `series` and write every report for `period`.
///
/// Only directory creation can fail the whole run. An input without any
/// lower-low tide produces no reports and is not an error.
pub fn run_analysis(
    series: &ObservationSeries,
    period: AnalysisPeriod,
    config: &Config,
    plots: PlotMode,
) -> Result<AnalysisSummary> {
    config.ensure_directories()?;
    let suffix = period.suffix();
    let table_path = |name: &str| -> PathBuf {
        let base = config.paths.processed_dir.join(format!("{}.csv", name));
        append_period_to_filename(&base, &suffix)
    };
    let plot_path = |name: &str| -> PathBuf {
        let base = config.paths.plots_dir.join(format!("{}.svg", name));
        append_period_to_filename(&base, &suffix)
    };
    let units = config.station.units;
    let station = &config.station.name;

    info!("Identifying lower-low tides...");
    let low_tides = identify_low_tides(series);
    let mut summary = AnalysisSummary {
        lower_low_count: low_tides.len(),
        reports: Vec::new(),
    };
    if low_tides.is_empty() {
        warn!("No low tides identified in the data.");
        return Ok(summary);
    }
    info!("Identified {} lower-low tides", low_tides.len());

    summary.record("detailed_low_tides", || {
        let outcome = export_to_csv(&to_records(&low_tides), table_path(DETAILED_LOW_TIDES))?;
        Ok(outcome.path)
    });

    summary.record("monthly_mean", || {
        info!("Calculating average low tide per month...");
        let table = monthly_mean(&low_tides);
        let outcome = export_to_csv(&table, table_path(MONTHLY_MEAN))?;
        let title = format!(
            "Average Low Tide per Month at {} between {} and {}",
            station, period.start_year, period.end_year
        );
        match plots {
            PlotMode::Svg => plot_monthly_mean(&table, &title, units, &plot_path(MONTHLY_MEAN))?,
            PlotMode::Terminal => draw_ascii(
                &title,
                &month_bars(table.iter().map(|r| (r.month_name.as_str(), r.mean_value))),
            ),
            PlotMode::Off => {}
        }
        Ok(outcome.path)
    });

    summary.record("daytime_monthly_mean", || {
        info!("Calculating average lowest daytime tide each month across all years...");
        let table = daytime_monthly_mean(&low_tides, config.aggregate_window());
        let outcome = export_to_csv(&table, table_path(DAYTIME_MONTHLY_MEAN))?;
        let title = "Average of Monthly Lowest Daytime Tide";
        match plots {
            PlotMode::Svg if !table.is_empty() => plot_daytime_monthly_mean(
                &table,
                title,
                units,
                &plot_path(DAYTIME_MONTHLY_MEAN),
            )?,
            PlotMode::Terminal => draw_ascii(
                title,
                &month_bars(
                    table
                        .iter()
                        .map(|r| (r.month_name.as_str(), r.average_lowest_tide)),
                ),
            ),
            _ => {}
        }
        Ok(outcome.path)
    });

    summary.record("yearly_monthly_mean", || {
        info!("Calculating average lowest daytime tide each month per year...");
        let output = table_path(YEARLY_MONTHLY_MEAN);
        let table = yearly_monthly_mean(&low_tides, config.aggregate_window(), &output)?;
        let title = "Average Monthly Lowest Day Tide by Year";
        match plots {
            PlotMode::Svg => {
                plot_yearly_monthly_mean(&table, title, units, &plot_path(YEARLY_MONTHLY_MEAN))?
            }
            PlotMode::Terminal => draw_yearly_ascii(&table, title),
            PlotMode::Off => {}
        }
        Ok(output)
    });

    summary.record("threshold_counts", || {
        let threshold = config.analysis.tidepool_threshold;
        info!("Counting daytime tides below {}...", threshold);
        let output = table_path(THRESHOLD_COUNTS);
        let table = count_below_threshold(&low_tides, threshold, config.threshold_window(), &output)?;
        let title = format!(
            "Average Monthly Count of Tidepool Tides During Daytime ({} to {})",
            period.start_year, period.end_year
        );
        match plots {
            PlotMode::Svg => plot_threshold_counts(
                &table,
                threshold,
                &title,
                units,
                &plot_path(THRESHOLD_COUNTS),
            )?,
            PlotMode::Terminal => draw_ascii(
                &title,
                &month_bars(
                    table
                        .iter()
                        .map(|r| (r.month_name.as_str(), r.average_count_below_threshold)),
                ),
            ),
            PlotMode::Off => {}
        }
        Ok(output)
    });

    for failed in summary.failures() {
        warn!("Report {} did not complete", failed.name);
    }
    Ok(summary)
}

/// Paths a run over `period` writes its tables to, in report order.
pub fn report_tables(config: &Config, period: AnalysisPeriod) -> Vec<PathBuf> {
    let suffix = period.suffix();
    [
        DETAILED_LOW_TIDES,
        MONTHLY_MEAN,
        DAYTIME_MONTHLY_MEAN,
        YEARLY_MONTHLY_MEAN,
        THRESHOLD_COUNTS,
    ]
    .iter()
    .map(|name| {
        let base = config.paths.processed_dir.join(format!("{}.csv", name));
        append_period_to_filename(&base, &suffix)
    })
    .collect()
}
