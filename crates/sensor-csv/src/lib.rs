//! # Sensor CSV
//!
//! This crate reads raw sensor rows from a delimited file and writes analyzed
//! rows back out. Parsing is lenient per row: a bad cell becomes an invalid
//! marker for the cleaner to drop, never an error. Only an unreadable file or
//! a header without the required columns fails a load.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use sensor_core::RawRecord;
use sensor_pipeline::{AnalyzedReading, AnomalyReport};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

// --- Schema ---

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const SENSOR_ID_COLUMN: &str = "sensor_id";
pub const VALUE_COLUMN: &str = "value";

/// Column order of every file this crate writes.
pub const OUTPUT_COLUMNS: [&str; 5] = ["timestamp", "sensor_id", "value", "rolling_avg", "delta"];

pub const CLEANED_FILE: &str = "cleaned.csv";
pub const OUT_OF_RANGE_FILE: &str = "out_of_range.csv";
pub const SPIKES_FILE: &str = "spikes.csv";

// --- Errors ---

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to read CSV header: {0}")]
    Header(#[source] csv::Error),
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("failed to read CSV data: {0}")]
    Read(#[source] csv::Error),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create '{path}': {source}")]
    Create { path: PathBuf, source: io::Error },
    #[error("failed to write '{path}': {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// One or more of the report files could not be written.
#[derive(Debug, Error)]
#[error("failed to write {} of 3 report files", .failures.len())]
pub struct ReportError {
    pub failures: Vec<WriteError>,
}

// --- Loading ---

/// Parses a timestamp cell. Unparsable input yields `None`.
///
/// Offsets are normalized to UTC. Naive forms are taken as given.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const NAIVE_FORMATS: [&str; 6] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Positions of the required columns in the header.
struct Columns {
    timestamp: usize,
    sensor_id: usize,
    value: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, LoadError> {
        // A repeated header name resolves to its first column.
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, name) in headers.iter().enumerate() {
            index
                .entry(name.trim_start_matches('\u{feff}').trim())
                .or_insert(i);
        }
        let find = |column: &'static str| {
            index
                .get(column)
                .copied()
                .ok_or(LoadError::MissingColumn(column))
        };
        Ok(Self {
            timestamp: find(TIMESTAMP_COLUMN)?,
            sensor_id: find(SENSOR_ID_COLUMN)?,
            value: find(VALUE_COLUMN)?,
        })
    }

    fn extract(&self, record: &StringRecord) -> RawRecord {
        let cell = |i: usize| record.get(i).filter(|s| !s.is_empty());
        RawRecord {
            timestamp: cell(self.timestamp).and_then(parse_timestamp),
            sensor_id: cell(self.sensor_id).map(str::to_string),
            value: cell(self.value).map(str::to_string),
        }
    }
}

/// Reads raw records from any CSV source with a header row.
pub fn read_records<R: Read>(source: R) -> Result<Vec<RawRecord>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let headers = reader.headers().map_err(LoadError::Header)?.clone();
    let columns = Columns::resolve(&headers)?;

    let mut records = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => records.push(columns.extract(&record)),
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(LoadError::Read(e));
            }
            // Undecodable rows become all-invalid records so they still count.
            Err(_) => records.push(RawRecord::default()),
        }
    }
    Ok(records)
}

/// Loads raw records from the file at `path`.
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_records(file)?;
    debug!(path = %path.display(), rows = records.len(), "loaded raw records");
    Ok(records)
}

// --- Writing ---

#[derive(Serialize)]
struct OutputRow<'a> {
    timestamp: String,
    sensor_id: &'a str,
    value: f64,
    rolling_avg: Option<f64>,
    delta: Option<f64>,
}

impl<'a> From<&'a AnalyzedReading> for OutputRow<'a> {
    fn from(row: &'a AnalyzedReading) -> Self {
        OutputRow {
            timestamp: format_timestamp(row.reading.timestamp),
            sensor_id: &row.reading.sensor_id,
            value: row.reading.value,
            rolling_avg: row.rolling_avg,
            delta: row.delta,
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS`, with fractional seconds only when non-zero.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

/// Writes analyzed rows as CSV to `sink`. The header is always written.
/// Missing values become empty cells.
pub fn write_rows_to<'a, W, I>(sink: W, rows: I) -> Result<usize, csv::Error>
where
    W: Write,
    I: IntoIterator<Item = &'a AnalyzedReading>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(sink);
    writer.write_record(OUTPUT_COLUMNS)?;

    let mut written = 0usize;
    for row in rows {
        writer.serialize(OutputRow::from(row))?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Writes analyzed rows to the file at `path`, creating parent directories.
pub fn write_rows<'a, I>(path: &Path, rows: I) -> Result<usize, WriteError>
where
    I: IntoIterator<Item = &'a AnalyzedReading>,
{
    let create = |source: io::Error| WriteError::Create {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(create)?;
    }
    let file = File::create(path).map_err(create)?;

    let written = write_rows_to(file, rows).map_err(|source| WriteError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), rows = written, "wrote report file");
    Ok(written)
}

/// Destinations of the three report files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub cleaned: PathBuf,
    pub out_of_range: PathBuf,
    pub spikes: PathBuf,
}

impl ReportFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            cleaned: dir.join(CLEANED_FILE),
            out_of_range: dir.join(OUT_OF_RANGE_FILE),
            spikes: dir.join(SPIKES_FILE),
        }
    }
}

/// Writes the analyzed dataset and both anomaly views.
///
/// Each file is written on its own: a failure is logged and the remaining
/// files are still attempted. Nothing already written is rolled back.
pub fn write_report(files: &ReportFiles, report: &AnomalyReport) -> Result<(), ReportError> {
    let attempts = [
        write_rows(&files.cleaned, report.dataset()),
        write_rows(&files.out_of_range, report.out_of_range()),
        write_rows(&files.spikes, report.spikes()),
    ];

    let failures: Vec<WriteError> = attempts
        .into_iter()
        .filter_map(Result::err)
        .inspect(|e| warn!(error = %e, "report file not written"))
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ReportError { failures })
    }
}
