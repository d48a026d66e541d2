//! # NOAA Tide Data Fetching and CSV Ingestion
//!
//! This module produces the [`ObservationSeries`] the analysis runs on, either
//! from a CSV export on disk or from NOAA's CO-OPS data API.
//!
//! ## Data Source
//!
//! ### NOAA CO-OPS Data Getter
//! - **URL**: https://api.tidesandcurrents.noaa.gov/api/prod/datagetter
//! - **Station**: configurable, default 9414131 (Pillar Point Harbor, CA)
//! - **Format**: JSON, `interval=hilo` so only high/low points are returned
//! - **Time zone**: `lst_ldt`, station-local civil time
//!
//! One request is issued per calendar year of the requested range and the
//! results are concatenated.
//!
//! ### CSV Input
//! A header row with `t`, `v` and optionally `type` columns (the same layout
//! this module writes for raw API downloads). `timestamp`, `value` and `kind`
//! are accepted as aliases.
//!
//! ## Error Handling
//!
//! Malformed rows fail the whole load with the offending line number; no row
//! is skipped silently. Network and service errors propagate through
//! [`TideError`] so the caller can abort before analysis.

use crate::config::{Config, Product};
use crate::error::{Result, TideError};
use crate::export::TableRow;
use crate::{ObservationSeries, TideKind, TideObservation};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timestamp layout written to CSV exports (NOAA's own layout)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Timestamp layouts accepted on input
const INPUT_TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Date-only input, read as midnight
const INPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date layout for NOAA `begin_date` / `end_date`
const NOAA_DATE_FORMAT: &str = "%Y%m%d";

/// Placeholder written to a fresh token file
pub const TOKEN_PLACEHOLDER: &str = "YOUR_NOAA_API_TOKEN";

/// Environment variable consulted before the token file
pub const TOKEN_ENV_VAR: &str = "NOAA_API_TOKEN";

/// One CSV row of a raw or detailed observation table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    #[serde(alias = "timestamp")]
    pub t: String,
    #[serde(alias = "value")]
    pub v: String,
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: Option<String>,
}

impl TableRow for ObservationRecord {
    const COLUMNS: &'static [&'static str] = &["t", "v", "type"];
}

impl From<&TideObservation> for ObservationRecord {
    fn from(obs: &TideObservation) -> Self {
        ObservationRecord {
            t: obs.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            v: obs.value.to_string(),
            kind: obs.kind.map(|k| k.token().to_string()),
        }
    }
}

impl ObservationRecord {
    /// Validate and convert into an observation; `line` is used for errors.
    pub fn to_observation(&self, line: u64) -> Result<TideObservation> {
        let timestamp = parse_timestamp(&self.t).ok_or_else(|| TideError::Parse {
            line,
            message: format!("unparsable timestamp `{}`", self.t),
        })?;
        let value: f64 = self
            .v
            .trim()
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| TideError::Parse {
                line,
                message: format!("unparsable value `{}`", self.v),
            })?;
        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(token) => Some(token.parse::<TideKind>().map_err(|e| TideError::Parse {
                line,
                message: e.to_string(),
            })?),
        };
        Ok(TideObservation::new(timestamp, value, kind))
    }
}

/// Convert a series into CSV rows.
pub fn to_records(series: &ObservationSeries) -> Vec<ObservationRecord> {
    series.iter().map(ObservationRecord::from).collect()
}

/// Parse any of the accepted civil timestamp layouts. A bare date is
/// midnight of that day.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    INPUT_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, INPUT_DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Load a tide series from a CSV file.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<ObservationSeries> {
    let path = path.as_ref();
    info!("Reading tidal data from {}", path.display());
    let series = read_csv(File::open(path)?)?;
    info!("Loaded {} observations", series.len());
    Ok(series)
}

/// Parse a tide series from any CSV reader.
pub fn read_csv<R: Read>(reader: R) -> Result<ObservationSeries> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let has = |names: &[&str]| headers.iter().any(|h| names.contains(&h));
    if !has(&["t", "timestamp"]) {
        return Err(TideError::MissingColumn("t"));
    }
    if !has(&["v", "value"]) {
        return Err(TideError::MissingColumn("v"));
    }

    let mut observations = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: ObservationRecord = record.deserialize(Some(&headers))?;
        observations.push(row.to_observation(line)?);
    }
    Ok(ObservationSeries::new(observations))
}

/// Resolve an input path: as given, then relative to `base_dir`.
///
/// Returns `None` when neither location exists.
pub fn resolve_input_path<P: AsRef<Path>>(path: P, base_dir: Option<&Path>) -> Option<PathBuf> {
    let candidate = path.as_ref();
    if candidate.exists() {
        return fs::canonicalize(candidate).ok();
    }
    let base_candidate = base_dir?.join(candidate);
    if base_candidate.exists() {
        return fs::canonicalize(base_candidate).ok();
    }
    None
}

// -- NOAA API --

#[derive(Debug, Deserialize)]
struct NoaaResponse {
    #[serde(default)]
    predictions: Option<Vec<ObservationRecord>>,
    #[serde(default)]
    water_level: Option<Vec<NoaaWaterLevel>>,
    #[serde(default)]
    error: Option<NoaaApiError>,
}

/// Water-level records carry extra quality fields we do not use
#[derive(Debug, Deserialize)]
struct NoaaWaterLevel {
    t: String,
    v: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NoaaApiError {
    message: String,
}

/// Decode a data getter JSON body for `product`.
pub fn parse_noaa_response(body: &str, product: Product) -> Result<Vec<TideObservation>> {
    let response: NoaaResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(TideError::Api(error.message));
    }

    let records: Vec<ObservationRecord> = match product {
        Product::Predictions => response.predictions,
        Product::WaterLevel => response.water_level.map(|rows| {
            rows.into_iter()
                .map(|w| ObservationRecord {
                    t: w.t,
                    v: w.v,
                    kind: w.kind,
                })
                .collect()
        }),
    }
    .ok_or_else(|| {
        TideError::Api(format!(
            "unexpected response format: no `{}` key",
            product.as_query()
        ))
    })?;

    records
        .iter()
        .enumerate()
        .map(|(i, record)| record.to_observation(i as u64 + 1))
        .collect()
}

/// Build the data getter query for one date range.
pub fn build_query(
    config: &Config,
    begin: NaiveDate,
    end: NaiveDate,
    token: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("product", config.api.product.as_query().to_string()),
        ("application", "web_services".to_string()),
        ("begin_date", begin.format(NOAA_DATE_FORMAT).to_string()),
        ("end_date", end.format(NOAA_DATE_FORMAT).to_string()),
        ("datum", "MLLW".to_string()),
        ("station", config.station.id.clone()),
        ("time_zone", "lst_ldt".to_string()),
        ("units", config.station.units.as_query().to_string()),
        ("interval", "hilo".to_string()),
        ("format", "json".to_string()),
    ];
    if let Some(token) = token {
        params.push(("token", token.to_string()));
    }
    params
}

/// Fetch hilo observations for `start..=end` from NOAA, one request per year.
pub async fn fetch(config: &Config, start: NaiveDate, end: NaiveDate) -> Result<ObservationSeries> {
    let token = if config.api.product.requires_token() {
        let token = load_api_token(&config.api.token_file).ok_or_else(|| {
            TideError::Config(format!(
                "product `{}` requires an API token ({} or {})",
                config.api.product.as_query(),
                TOKEN_ENV_VAR,
                config.api.token_file.display()
            ))
        })?;
        Some(token)
    } else {
        None
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api.timeout_secs))
        .build()?;

    let mut observations = Vec::new();
    for year in start.year()..=end.year() {
        let begin = start.max(NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(start));
        let finish = end.min(NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(end));
        debug!("Requesting {} to {}", begin, finish);

        let body = client
            .get(&config.api.url)
            .query(&build_query(config, begin, finish, token.as_deref()))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let chunk = parse_noaa_response(&body, config.api.product)?;
        info!("Fetched {} observations for {}", chunk.len(), year);
        observations.extend(chunk);
    }

    Ok(ObservationSeries::new(observations))
}

// -- API token --

#[derive(Debug, Deserialize)]
struct TokenFile {
    token: String,
}

/// Token from `NOAA_API_TOKEN`, else from `token_file`; the placeholder
/// counts as absent.
pub fn load_api_token(token_file: &Path) -> Option<String> {
    resolve_api_token(std::env::var(TOKEN_ENV_VAR).ok(), token_file)
}

fn resolve_api_token(from_env: Option<String>, token_file: &Path) -> Option<String> {
    let usable = |token: String| {
        let token = token.trim().to_string();
        (!token.is_empty() && token != TOKEN_PLACEHOLDER).then_some(token)
    };
    if let Some(token) = from_env.and_then(usable) {
        return Some(token);
    }

    let contents = fs::read_to_string(token_file).ok()?;
    let token = toml::from_str::<TokenFile>(&contents)
        .ok()
        .and_then(|f| usable(f.token));
    if token.is_none() {
        warn!("API token is not set; edit {}", token_file.display());
    }
    token
}

/// Write a token template to `token_file` if it does not exist yet.
///
/// Returns `true` when a template was created.
pub fn ensure_api_token_file(token_file: &Path) -> Result<bool> {
    if token_file.exists() {
        return Ok(false);
    }
    fs::write(
        token_file,
        format!(
            "# NOAA CO-OPS API token\ntoken = \"{}\"  # Replace with your actual token\n",
            TOKEN_PLACEHOLDER
        ),
    )?;
    warn!(
        "Created {}. Please add your NOAA API token to this file.",
        token_file.display()
    );
    Ok(true)
}
