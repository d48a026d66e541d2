//! # CSV Export with Backup Rotation
//!
//! Result tables are small, human-reviewed files. Rather than overwrite a
//! previous run, an existing file at the target path is renamed to
//! `<stem>.bak_<YYYYMMDD_HHMMSS><ext>` before the new table is written.
//!
//! ```text
//! data/processed/monthly_low_tide_average_2019_2024.csv                 <- new
//! data/processed/monthly_low_tide_average_2019_2024.bak_20240611_093015.csv
//! ```
//!
//! Two rotations within the same second get a `_1`, `_2`, ... counter so an
//! older backup is never replaced.

use crate::error::Result;
use chrono::{Local, NaiveDateTime};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Timestamp layout used in backup file names; sorts lexicographically
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A serializable table row with a fixed header.
///
/// The header is declared up front so an empty table still produces a file
/// with its column names.
pub trait TableRow: Serialize {
    /// Column names, in the same order as the serialized fields
    const COLUMNS: &'static [&'static str];
}

/// What [`export_to_csv`] did on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Path holding the new table
    pub path: PathBuf,
    /// Where the previous file went, if there was one
    pub backup: Option<PathBuf>,
    /// Number of data rows written (header excluded)
    pub rows: usize,
}

/// Write `rows` to `path` as CSV with a header row.
///
/// Parent directories are created as needed. A pre-existing file is rotated
/// to a timestamped backup first; a collision is never an error.
pub fn export_to_csv<T: TableRow, P: AsRef<Path>>(rows: &[T], path: P) -> Result<ExportOutcome> {
    export_to_csv_at(rows, path, Local::now().naive_local())
}

/// [`export_to_csv`] with an explicit clock reading for the backup name.
pub fn export_to_csv_at<T: TableRow, P: AsRef<Path>>(
    rows: &[T],
    path: P,
    now: NaiveDateTime,
) -> Result<ExportOutcome> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let backup = rotate_existing(path, now)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(T::COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("Data exported to {}", path.display());
    Ok(ExportOutcome {
        path: path.to_path_buf(),
        backup,
        rows: rows.len(),
    })
}

/// Rename an existing file at `path` out of the way, returning its new path.
pub fn rotate_existing(path: &Path, now: NaiveDateTime) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let stamp = now.format(BACKUP_TIMESTAMP_FORMAT).to_string();
    let mut attempt = 0;
    let rotated = loop {
        let candidate = backup_path(path, &stamp, attempt);
        if !candidate.exists() {
            break candidate;
        }
        attempt += 1;
    };

    warn!(
        "{} already exists. Renaming existing file to {}",
        path.display(),
        rotated.display()
    );
    fs::rename(path, &rotated)?;
    Ok(Some(rotated))
}

/// `dir/stem.ext` -> `dir/stem.bak_<stamp>[_<attempt>].ext`
fn backup_path(path: &Path, stamp: &str, attempt: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let counter = if attempt == 0 {
        String::new()
    } else {
        format!("_{}", attempt)
    };
    path.with_file_name(format!("{stem}.bak_{stamp}{counter}{extension}"))
}

/// Year-range label for output file names, e.g. `2019_2024`.
pub fn build_period_suffix(start_year: i32, end_year: i32) -> String {
    format!("{}_{}", start_year, end_year)
}

/// Insert `_<suffix>` between the file stem and its extension.
///
/// ```
/// use std::path::Path;
/// use tidal_variance_lib::export::append_period_to_filename;
///
/// let path = append_period_to_filename(Path::new("data/raw/raw_tide_data.csv"), "2019_2024");
/// assert_eq!(path, Path::new("data/raw/raw_tide_data_2019_2024.csv"));
/// ```
pub fn append_period_to_filename(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[derive(Serialize)]
    struct Row {
        t: String,
        v: f64,
    }

    impl TableRow for Row {
        const COLUMNS: &'static [&'static str] = &["t", "v"];
    }

    fn row(t: &str, v: f64) -> Row {
        Row {
            t: t.to_string(),
            v,
        }
    }

    fn clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 11)
            .unwrap()
            .and_hms_opt(9, 30, 15)
            .unwrap()
    }

    fn backups_in(dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().contains(".bak_"))
            .collect();
        found.sort();
        found
    }

    #[test]
    fn first_export_creates_parents_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("table.csv");

        let outcome = export_to_csv(&[row("2024-01-01 12:00", 1.0)], &path).unwrap();
        assert_eq!(outcome.backup, None);
        assert_eq!(outcome.rows, 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "t,v\n2024-01-01 12:00,1.0\n"
        );
    }

    #[test]
    fn empty_table_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        export_to_csv::<Row, _>(&[], &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "t,v\n");
    }

    #[test]
    fn existing_file_is_rotated_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw_tide_data_2019_2024.csv");

        export_to_csv_at(&[row("2024-01-01 12:00", 1.0)], &path, clock()).unwrap();
        let outcome = export_to_csv_at(&[row("2024-01-02 12:00", 2.0)], &path, clock()).unwrap();

        let expected_backup = dir
            .path()
            .join("raw_tide_data_2019_2024.bak_20240611_093015.csv");
        assert_eq!(outcome.backup, Some(expected_backup.clone()));
        assert_eq!(backups_in(dir.path()), vec![expected_backup.clone()]);
        assert_eq!(
            fs::read_to_string(&expected_backup).unwrap(),
            "t,v\n2024-01-01 12:00,1.0\n"
        );
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "t,v\n2024-01-02 12:00,2.0\n"
        );
    }

    #[test]
    fn same_second_rotations_do_not_clobber_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.csv");

        for v in [1.0, 2.0, 3.0] {
            export_to_csv_at(&[row("x", v)], &path, clock()).unwrap();
        }

        let backups = backups_in(dir.path());
        assert_eq!(backups.len(), 2);
        assert_eq!(
            backups[0].file_name().unwrap(),
            "counts.bak_20240611_093015.csv"
        );
        assert_eq!(
            backups[1].file_name().unwrap(),
            "counts.bak_20240611_093015_1.csv"
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "t,v\nx,3.0\n");
    }

    #[test]
    fn period_suffix_is_inserted_before_extension() {
        assert_eq!(build_period_suffix(2019, 2024), "2019_2024");
        assert_eq!(
            append_period_to_filename(Path::new("out/plots/chart.svg"), "2020_2021"),
            Path::new("out/plots/chart_2020_2021.svg")
        );
        assert_eq!(
            append_period_to_filename(Path::new("no_extension"), "2020_2020"),
            Path::new("no_extension_2020_2020")
        );
    }
}
