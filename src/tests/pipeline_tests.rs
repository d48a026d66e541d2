//! # End-to-End Pipeline Tests
//!
//! Each test points the output directories at a fresh temporary directory and
//! runs the full report pipeline over the fixture.

use super::fixture_series;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tidal_variance_lib::config::Config;
use tidal_variance_lib::pipeline::{
    report_tables, run_analysis, AnalysisPeriod, PlotMode, MONTHLY_MEAN,
};
use tidal_variance_lib::{ObservationSeries, TideKind, TideObservation};

fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.paths.raw_dir = dir.join("data").join("raw");
    config.paths.processed_dir = dir.join("data").join("processed");
    config.paths.plots_dir = dir.join("out").join("plots");
    config
}

fn fixture_period() -> AnalysisPeriod {
    AnalysisPeriod::new(2024, 2024)
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    found.sort();
    found
}

/// A full run writes all five tables with the expected headers and one SVG
/// per report.
#[test]
fn full_run_writes_every_table_and_chart() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());

    let summary =
        run_analysis(&fixture_series(), fixture_period(), &config, PlotMode::Svg).unwrap();
    assert!(summary.is_success(), "failures: {:?}", summary.reports);
    assert_eq!(summary.lower_low_count, 10);
    assert_eq!(summary.reports.len(), 5);

    let headers = [
        "t,v,type",
        "month,mean_value,month_name",
        "month,average_lowest_tide,month_name",
        "year,month,average_lowest_tide,month_name",
        "month,average_count_below_threshold,month_name",
    ];
    for (path, header) in report_tables(&config, fixture_period()).iter().zip(headers) {
        let contents = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("{} should exist: {}", path.display(), e));
        assert_eq!(contents.lines().next(), Some(header), "{}", path.display());
    }

    let charts = files_in(&config.paths.plots_dir);
    assert_eq!(charts.len(), 4, "one chart per aggregate report");
    assert!(charts
        .iter()
        .all(|p| p.extension().is_some_and(|e| e == "svg")));
}

/// Table file names carry the analysis period.
#[test]
fn table_names_carry_period_suffix() {
    let config = config_in(Path::new("/tmp/unused"));
    let tables = report_tables(&config, AnalysisPeriod::new(2019, 2024));

    assert_eq!(
        tables[0],
        config
            .paths
            .processed_dir
            .join("detailed_low_tide_data_2019_2024.csv")
    );
    assert_eq!(
        tables[4],
        config
            .paths
            .processed_dir
            .join("monthly_avg_count_below_tidepool_daytime_2019_2024.csv")
    );
}

/// The exported threshold table has twelve data rows with January at 3.
#[test]
fn threshold_table_contents() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    run_analysis(&fixture_series(), fixture_period(), &config, PlotMode::Off).unwrap();

    let path = &report_tables(&config, fixture_period())[4];
    let contents = fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();

    assert_eq!(lines.len(), 13, "header plus twelve months");
    assert_eq!(lines[1], "1,3.0,January");
    assert_eq!(lines[2], "2,0.0,February");
    assert_eq!(lines[12], "12,0.0,December");
}

/// The detailed table lists the lower lows in time order.
#[test]
fn detailed_table_lists_lower_lows() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    run_analysis(&fixture_series(), fixture_period(), &config, PlotMode::Off).unwrap();

    let path = &report_tables(&config, fixture_period())[0];
    let contents = fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();

    assert_eq!(lines.len(), 11);
    assert_eq!(lines[1], "2024-01-01 03:10,1.696,L");
    assert_eq!(lines[5], "2024-01-05 10:05,-0.043,L");
    assert_eq!(lines[10], "2024-01-10 19:00,-0.656,L");
}

/// Running twice into the same directory keeps the first run's tables as
/// backups instead of overwriting them.
#[test]
fn rerun_rotates_previous_tables() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    let series = fixture_series();

    run_analysis(&series, fixture_period(), &config, PlotMode::Off).unwrap();
    run_analysis(&series, fixture_period(), &config, PlotMode::Off).unwrap();

    let files = files_in(&config.paths.processed_dir);
    let backups: Vec<&PathBuf> = files
        .iter()
        .filter(|p| p.to_string_lossy().contains(".bak_"))
        .collect();
    assert_eq!(files.len(), 10);
    assert_eq!(backups.len(), 5, "one backup per table");

    for table in report_tables(&config, fixture_period()) {
        assert!(table.exists(), "{} should be rewritten", table.display());
    }
}

/// Two clean runs over the same input produce byte-identical tables.
#[test]
fn clean_runs_are_reproducible() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let series = fixture_series();

    let config_a = config_in(first.path());
    let config_b = config_in(second.path());
    run_analysis(&series, fixture_period(), &config_a, PlotMode::Off).unwrap();
    run_analysis(&series, fixture_period(), &config_b, PlotMode::Off).unwrap();

    let tables_a = report_tables(&config_a, fixture_period());
    let tables_b = report_tables(&config_b, fixture_period());
    for (a, b) in tables_a.iter().zip(&tables_b) {
        assert_eq!(
            fs::read(a).unwrap(),
            fs::read(b).unwrap(),
            "{} differs between runs",
            a.file_name().unwrap().to_string_lossy()
        );
    }
}

/// Input with no low tides yields no reports and no error.
#[test]
fn highs_only_input_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    let highs: ObservationSeries = fixture_series()
        .iter()
        .filter(|obs| obs.kind == Some(TideKind::High))
        .cloned()
        .collect();

    let summary = run_analysis(&highs, fixture_period(), &config, PlotMode::Off).unwrap();
    assert_eq!(summary.lower_low_count, 0);
    assert!(summary.reports.is_empty());
    assert!(files_in(&config.paths.processed_dir).is_empty());
}

/// A report that cannot write its chart fails alone; the others complete.
#[test]
fn failing_report_does_not_stop_siblings() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    let period = fixture_period();

    // A directory where the monthly chart should go makes the SVG write fail
    let blocked = config
        .paths
        .plots_dir
        .join(format!("{}_{}.svg", MONTHLY_MEAN, period.suffix()));
    fs::create_dir_all(&blocked).unwrap();

    let summary = run_analysis(&fixture_series(), period, &config, PlotMode::Svg).unwrap();
    let failed: Vec<&str> = summary.failures().map(|r| r.name).collect();
    assert_eq!(failed, vec!["monthly_mean"]);
    assert_eq!(summary.reports.len(), 5);

    // The table is exported before the chart is drawn
    assert!(report_tables(&config, period)[1].exists());
    assert!(report_tables(&config, period)[4].exists());
}

/// An empty series falls back to the configured default years.
#[test]
fn period_falls_back_to_configured_years() {
    let config = Config::default();
    let empty = ObservationSeries::default();
    assert_eq!(
        AnalysisPeriod::from_series(&empty, &config),
        AnalysisPeriod::new(2019, 2024)
    );

    let single: ObservationSeries = vec![TideObservation::new(
        chrono::NaiveDate::from_ymd_opt(2021, 7, 4)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap(),
        0.2,
        Some(TideKind::Low),
    )]
    .into_iter()
    .collect();
    assert_eq!(
        AnalysisPeriod::from_series(&single, &config).suffix(),
        "2021_2021"
    );
}
