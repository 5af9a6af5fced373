//! # Sensor Core
//!
//! This crate provides the core data structures for sensor data processing.
//! It defines the `SensorObservation` trait, a generic read-only view over a
//! timestamped sensor value, together with the loader's `RawRecord`, the
//! cleaned `Reading` and the `Dataset` that groups rows into per-sensor series.
//! It also carries the `PipelineConfig` shared by every processing stage.

mod config;

pub use config::{ConfigError, PipelineConfig};

use chrono::NaiveDateTime;

pub trait SensorObservation {
    fn sensor_id(&self) -> &str;
    fn timestamp(&self) -> NaiveDateTime;
    fn value(&self) -> f64;
}

/// A row as handed over by the loader.
///
/// `None` is the explicit invalid marker: the cell was missing, empty or (for
/// the timestamp) could not be parsed. The value is kept untyped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub sensor_id: Option<String>,
    pub value: Option<String>,
}

/// A cleaned observation with every field present and a finite value.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub sensor_id: String,
    pub value: f64,
}

impl SensorObservation for Reading {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn value(&self) -> f64 {
        self.value
    }
}

impl From<&Reading> for RawRecord {
    fn from(reading: &Reading) -> Self {
        RawRecord {
            timestamp: Some(reading.timestamp),
            sensor_id: Some(reading.sensor_id.clone()),
            // `Display` for f64 is round-trip exact.
            value: Some(reading.value.to_string()),
        }
    }
}

/// All rows of a run, laid out so that each sensor's rows are contiguous and
/// time-ordered.
///
/// The row type is generic so the same container carries cleaned, smoothed
/// and analyzed rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<T = Reading> {
    rows: Vec<T>,
}

impl<T> Default for Dataset<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T> Dataset<T> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.rows.iter()
    }
}

impl<T: SensorObservation> Dataset<T> {
    /// Wraps rows that are already in series order: each sensor's rows
    /// contiguous and time-ordered. The caller sorts; unsorted rows would
    /// split one sensor into several series.
    pub fn from_rows(rows: Vec<T>) -> Self {
        debug_assert!(in_series_order(&rows), "rows are not in series order");
        Self { rows }
    }

    /// Iterates over the per-sensor series in dataset order.
    pub fn series(&self) -> impl Iterator<Item = Series<'_, T>> {
        series_of(&self.rows)
    }

    /// Returns the series of one sensor, matched by exact id.
    pub fn series_for(&self, sensor_id: &str) -> Option<Series<'_, T>> {
        self.series().find(|s| s.sensor_id() == sensor_id)
    }

    /// Checks the series invariant; see [`in_series_order`].
    pub fn is_series_ordered(&self) -> bool {
        in_series_order(&self.rows)
    }
}

impl<'a, T> IntoIterator for &'a Dataset<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Checks the series invariant: timestamps never decrease within a sensor,
/// and no sensor id appears in two separate runs.
pub fn in_series_order<T: SensorObservation>(rows: &[T]) -> bool {
    let mut seen: Vec<&str> = Vec::new();
    for series in series_of(rows) {
        if seen.contains(&series.sensor_id()) {
            return false;
        }
        seen.push(series.sensor_id());
        let ordered = series
            .rows()
            .windows(2)
            .all(|pair| pair[0].timestamp() <= pair[1].timestamp());
        if !ordered {
            return false;
        }
    }
    true
}

/// Splits a slice into maximal runs of rows sharing a sensor id.
pub fn series_of<T: SensorObservation>(rows: &[T]) -> impl Iterator<Item = Series<'_, T>> {
    rows.chunk_by(|a, b| a.sensor_id() == b.sensor_id())
        .map(|rows| Series { rows })
}

/// One sensor's rows, time-ordered. Never empty.
#[derive(Debug, Clone, Copy)]
pub struct Series<'a, T> {
    rows: &'a [T],
}

impl<'a, T: SensorObservation> Series<'a, T> {
    pub fn sensor_id(&self) -> &'a str {
        let rows: &'a [T] = self.rows;
        rows[0].sensor_id()
    }

    pub fn rows(&self) -> &'a [T] {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'a, T> {
        self.rows.iter()
    }
}
