//! Error types shared by acquisition, analysis and export.

use std::io;
use thiserror::Error;

/// Errors that can occur anywhere in the tidal variance pipeline.
///
/// Empty inputs are never errors: detectors and aggregators return empty or
/// zero-filled tables instead. Everything here is a real failure that the
/// caller has to report.
#[derive(Error, Debug)]
pub enum TideError {
    /// HTTP request failed (network, timeout, or non-success status)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// NOAA answered but the payload was an error or had an unexpected shape
    #[error("NOAA API error: {0}")]
    Api(String),

    /// JSON decoding of an API response failed
    #[error("JSON decoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading or writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File system operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// An input row held an unparsable timestamp, value or kind
    #[error("malformed input at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// A required input column is absent from the header row
    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),

    /// Unknown high/low token
    #[error("unknown tide type `{0}`")]
    InvalidKind(String),

    /// Configuration rejected by validation
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Chart rendering failed
    #[error("plot rendering failed: {0}")]
    Plot(String),
}

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, TideError>;
