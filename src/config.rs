//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! `tidal-variance.toml` file. Every value the analysis depends on (station,
//! daytime windows, tidepool threshold, output directories, NOAA endpoint)
//! lives in one [`Config`] value that is passed explicitly into the pipeline,
//! so tests can run arbitrary configurations side by side.

use crate::error::{Result, TideError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "tidal-variance.toml";

/// Application configuration loaded from `tidal-variance.toml`
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// NOAA station configuration
    pub station: StationConfig,
    /// Analysis windows and thresholds
    pub analysis: AnalysisConfig,
    /// Output directory layout
    pub paths: PathsConfig,
    /// NOAA CO-OPS API access
    pub api: ApiConfig,
}

/// NOAA tide station configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StationConfig {
    /// NOAA station ID (e.g., "9414131" for Pillar Point Harbor, CA)
    pub id: String,
    /// Human-readable station name used in chart titles
    pub name: String,
    /// Unit system requested from NOAA; thresholds use the same unit
    pub units: Units,
}

/// Unit system for tide heights
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    /// Feet (NOAA `english`)
    English,
    /// Meters (NOAA `metric`)
    Metric,
}

impl Units {
    /// Value of the NOAA `units` query parameter
    pub fn as_query(self) -> &'static str {
        match self {
            Units::English => "english",
            Units::Metric => "metric",
        }
    }

    /// Short axis label suffix
    pub fn abbreviation(self) -> &'static str {
        match self {
            Units::English => "ft",
            Units::Metric => "m",
        }
    }
}

/// Analysis windows, thresholds and the fallback year range
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// First hour of the daytime window (0-23)
    pub day_start_hour: u32,
    /// Last hour of the daytime window (0-23); see the `*_window_end` fields
    pub day_end_hour: u32,
    /// Whether `day_end_hour` itself belongs to the window for the
    /// monthly/yearly lowest-tide means
    pub aggregate_window_end: WindowEnd,
    /// Whether `day_end_hour` itself belongs to the window for the
    /// tidepool threshold counts
    pub threshold_window_end: WindowEnd,
    /// Highest tide still considered good for tidepooling
    pub tidepool_threshold: f64,
    /// First year fetched from NOAA when no input series supplies a range
    pub default_start_year: i32,
    /// Last year fetched from NOAA when no input series supplies a range
    pub default_end_year: i32,
}

/// Output directory layout
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Raw observation exports (API downloads)
    pub raw_dir: PathBuf,
    /// Computed summary tables
    pub processed_dir: PathBuf,
    /// Rendered charts
    pub plots_dir: PathBuf,
}

/// NOAA CO-OPS API access
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Data getter endpoint
    pub url: String,
    /// Product to request
    pub product: Product,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// File holding `token = "..."` for products that require one
    pub token_file: PathBuf,
}

/// NOAA data product
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    /// Astronomical predictions, no token needed
    Predictions,
    /// Observed water levels, token required
    WaterLevel,
}

impl Product {
    /// Query parameter value, also the key of the record array in the response
    pub fn as_query(self) -> &'static str {
        match self {
            Product::Predictions => "predictions",
            Product::WaterLevel => "water_level",
        }
    }

    pub fn requires_token(self) -> bool {
        matches!(self, Product::WaterLevel)
    }
}

/// Whether the last hour of a daytime window is included.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowEnd {
    /// `hour in [start, end]`
    Inclusive,
    /// `hour in [start, end)`
    Exclusive,
}

/// Hour-of-day window used to select daytime observations.
///
/// # Example
/// ```
/// use tidal_variance_lib::config::{DayWindow, WindowEnd};
///
/// let closed = DayWindow::new(10, 16, WindowEnd::Inclusive);
/// let half_open = DayWindow::new(10, 16, WindowEnd::Exclusive);
///
/// assert!(closed.contains(16));
/// assert!(!half_open.contains(16));
/// assert!(half_open.contains(10));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub end: WindowEnd,
}

impl DayWindow {
    pub fn new(start_hour: u32, end_hour: u32, end: WindowEnd) -> Self {
        DayWindow {
            start_hour,
            end_hour,
            end,
        }
    }

    pub fn contains(&self, hour: u32) -> bool {
        if hour < self.start_hour {
            return false;
        }
        match self.end {
            WindowEnd::Inclusive => hour <= self.end_hour,
            WindowEnd::Exclusive => hour < self.end_hour,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            station: StationConfig {
                id: "9414131".to_string(),
                name: "Pillar Point Harbor, CA".to_string(),
                units: Units::English,
            },
            analysis: AnalysisConfig {
                day_start_hour: 10,
                day_end_hour: 16,
                aggregate_window_end: WindowEnd::Inclusive,
                threshold_window_end: WindowEnd::Exclusive,
                tidepool_threshold: 0.1,
                default_start_year: 2019,
                default_end_year: 2024,
            },
            paths: PathsConfig {
                raw_dir: PathBuf::from("data/raw"),
                processed_dir: PathBuf::from("data/processed"),
                plots_dir: PathBuf::from("out/plots"),
            },
            api: ApiConfig {
                url: "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter".to_string(),
                product: Product::Predictions,
                timeout_secs: 15,
                token_file: PathBuf::from("api_token.toml"),
            },
        }
    }
}

impl Config {
    /// Load configuration from `tidal-variance.toml` in the working directory.
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml(&contents) {
                Ok(config) => {
                    info!(
                        "Loaded configuration for station {} ({})",
                        config.station.id, config.station.name
                    );
                    config
                }
                Err(e) => {
                    warn!("Invalid config file {}: {}", path.display(), e);
                    warn!("Using default configuration (Pillar Point Harbor, CA)");
                    Self::default()
                }
            },
            Err(_) => {
                info!(
                    "No config file at {}, using default configuration (Pillar Point Harbor, CA)",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Load configuration from a file the user named explicitly.
    /// Unlike [`Config::load_from_path`], a missing or invalid file is an error.
    pub fn load_required<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)
            .map_err(|e| TideError::Config(format!("{}: {}", path.display(), e)))?;
        info!(
            "Loaded configuration for station {} ({})",
            config.station.id, config.station.name
        );
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).map_err(|e| TideError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save current configuration to the given path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| TideError::Config(e.to_string()))?;
        fs::write(&path, contents)?;
        info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Reject hour windows and year ranges that cannot describe a real analysis
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        if a.day_start_hour > 23 || a.day_end_hour > 23 {
            return Err(TideError::Config(format!(
                "daytime hours must be within 0-23, got {}-{}",
                a.day_start_hour, a.day_end_hour
            )));
        }
        if a.day_start_hour > a.day_end_hour {
            return Err(TideError::Config(format!(
                "day_start_hour {} is after day_end_hour {}",
                a.day_start_hour, a.day_end_hour
            )));
        }
        if a.default_end_year < a.default_start_year {
            return Err(TideError::Config(format!(
                "default_end_year {} is before default_start_year {}",
                a.default_end_year, a.default_start_year
            )));
        }
        if !a.tidepool_threshold.is_finite() {
            return Err(TideError::Config(
                "tidepool_threshold must be a finite number".to_string(),
            ));
        }
        Ok(())
    }

    /// Window used by the lowest-daytime-tide means
    pub fn aggregate_window(&self) -> DayWindow {
        DayWindow::new(
            self.analysis.day_start_hour,
            self.analysis.day_end_hour,
            self.analysis.aggregate_window_end,
        )
    }

    /// Window used by the tidepool threshold counter
    pub fn threshold_window(&self) -> DayWindow {
        DayWindow::new(
            self.analysis.day_start_hour,
            self.analysis.day_end_hour,
            self.analysis.threshold_window_end,
        )
    }

    /// Create the raw, processed and plot directories
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.paths.raw_dir,
            &self.paths.processed_dir,
            &self.paths.plots_dir,
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
