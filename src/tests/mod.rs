mod pipeline_tests;

use std::path::PathBuf;
use tidal_variance_lib::tide_data::load_csv;
use tidal_variance_lib::ObservationSeries;

/// Ten days of January 2024 hilo observations from a mixed semidiurnal station
pub(crate) fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("raw_tide_data_subset.csv")
}

pub(crate) fn fixture_series() -> ObservationSeries {
    load_csv(fixture_path()).expect("fixture should load")
}

pub(crate) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
