//! # Tidal Variance Entry Point
//!
//! Loads observations from a CSV file or the NOAA CO-OPS API, then writes
//! the monthly lower-low tide reports. SVG charts are written by default;
//! `--stdout` prints terminal bar charts instead.

#[cfg(test)]
mod tests;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::path::{Path, PathBuf};
use tidal_variance_lib::config::{Config, DEFAULT_CONFIG_FILE};
use tidal_variance_lib::export::{append_period_to_filename, export_to_csv};
use tidal_variance_lib::pipeline::{run_analysis, AnalysisPeriod, PlotMode};
use tidal_variance_lib::tide_data::{self, ensure_api_token_file, resolve_input_path};
use tidal_variance_lib::ObservationSeries;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Source {
    /// Read a CSV export from disk
    Csv,
    /// Download hilo observations from NOAA
    Api,
}

#[derive(Debug, Parser)]
#[command(
    name = "tidal-variance",
    version,
    about = "Monthly lower-low tide reports from NOAA high/low observations"
)]
struct Cli {
    /// Where observations come from
    #[arg(long, value_enum, default_value_t = Source::Csv)]
    source: Source,

    /// CSV input, resolved against the working directory then the config directory
    #[arg(long, default_value = "data/raw/raw_tide_data.csv")]
    csv_path: PathBuf,

    /// File name for the raw API download; relative paths land in the raw directory
    #[arg(long, default_value = "raw_tide_data.csv")]
    api_raw_output: PathBuf,

    /// Configuration file; must exist and parse when given (default: optional tidal-variance.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// First year to fetch from the API
    #[arg(long)]
    start_year: Option<i32>,

    /// Last year to fetch from the API
    #[arg(long)]
    end_year: Option<i32>,

    /// Print bar charts to the terminal instead of writing SVG files
    #[arg(long)]
    stdout: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// Raw download path: `.csv` added when missing, relative paths placed in
/// `raw_dir`, period suffix appended.
fn raw_output_path(requested: &Path, raw_dir: &Path, period: AnalysisPeriod) -> PathBuf {
    let mut path = requested.to_path_buf();
    if path.extension().is_none() {
        path.set_extension("csv");
    }
    if path.is_relative() {
        path = raw_dir.join(path);
    }
    append_period_to_filename(&path, &period.suffix())
}

/// An explicitly named config file must load; otherwise the default file is
/// optional.
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => Config::load_required(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(Config::load_from_path(DEFAULT_CONFIG_FILE)),
    }
}

fn load_from_csv(cli: &Cli) -> anyhow::Result<ObservationSeries> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config_dir = config_path.parent().filter(|p| !p.as_os_str().is_empty());
    let path = resolve_input_path(&cli.csv_path, config_dir)
        .with_context(|| format!("CSV file not found: {}", cli.csv_path.display()))?;
    info!("Loading observations from {}", path.display());
    tide_data::load_csv(&path).with_context(|| format!("failed to load {}", path.display()))
}

fn load_from_api(
    cli: &Cli,
    config: &Config,
    period: AnalysisPeriod,
) -> anyhow::Result<ObservationSeries> {
    if config.api.product.requires_token() && ensure_api_token_file(&config.api.token_file)? {
        bail!(
            "add your NOAA API token to {} and run again",
            config.api.token_file.display()
        );
    }

    let start = NaiveDate::from_ymd_opt(period.start_year, 1, 1)
        .with_context(|| format!("invalid start year {}", period.start_year))?;
    let end = NaiveDate::from_ymd_opt(period.end_year, 12, 31)
        .with_context(|| format!("invalid end year {}", period.end_year))?;

    info!(
        "Fetching {} for station {} from {} to {}",
        config.api.product.as_query(),
        config.station.id,
        start,
        end
    );
    let rt = tokio::runtime::Runtime::new()?;
    let series = rt
        .block_on(tide_data::fetch(config, start, end))
        .context("NOAA fetch failed")?;

    let raw_path = raw_output_path(&cli.api_raw_output, &config.paths.raw_dir, period);
    export_to_csv(&tide_data::to_records(&series), &raw_path)?;
    Ok(series)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    config.ensure_directories()?;

    let (series, period) = match cli.source {
        Source::Csv => {
            let series = load_from_csv(&cli)?;
            let period = AnalysisPeriod::from_series(&series, &config);
            (series, period)
        }
        Source::Api => {
            let period = AnalysisPeriod::new(
                cli.start_year.unwrap_or(config.analysis.default_start_year),
                cli.end_year.unwrap_or(config.analysis.default_end_year),
            );
            if period.end_year < period.start_year {
                bail!(
                    "end year {} is before start year {}",
                    period.end_year,
                    period.start_year
                );
            }
            (load_from_api(&cli, &config, period)?, period)
        }
    };

    if series.is_empty() {
        bail!("no observations loaded; nothing to analyse");
    }
    info!(
        "Loaded {} observations covering {} to {}",
        series.len(),
        period.start_year,
        period.end_year
    );

    let plots = if cli.stdout {
        PlotMode::Terminal
    } else {
        PlotMode::Svg
    };
    let summary = run_analysis(&series, period, &config, plots)?;

    if summary.lower_low_count == 0 {
        warn!("No lower-low tides found; no reports written");
        return Ok(());
    }
    if !summary.is_success() {
        bail!(
            "{} of {} reports failed",
            summary.failures().count(),
            summary.reports.len()
        );
    }
    info!("Analysis completed for {}", period.suffix());
    Ok(())
}
