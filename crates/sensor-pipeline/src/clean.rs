//! # Clean
//!
//! Turns loader output into a `Dataset`: values are coerced to numbers, rows
//! with any invalid field are dropped, and the survivors are ordered by
//! sensor id and then timestamp.

use sensor_core::{Dataset, RawRecord, Reading};
use tracing::debug;

/// Row counts observed while cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanStats {
    pub rows_read: usize,
    pub rows_kept: usize,
}

impl CleanStats {
    pub fn rows_dropped(&self) -> usize {
        self.rows_read - self.rows_kept
    }
}

/// Coerces a raw cell to a finite number.
///
/// Surrounding whitespace is ignored. Anything that does not parse, and the
/// non-finite results `NaN` and `inf`, yield `None`.
pub fn coerce_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn to_reading(record: RawRecord) -> Option<Reading> {
    let timestamp = record.timestamp?;
    let sensor_id = record.sensor_id.filter(|id| !id.is_empty())?;
    let value = record.value.as_deref().and_then(coerce_value)?;
    Some(Reading {
        timestamp,
        sensor_id,
        value,
    })
}

/// Cleans raw records into a series-ordered dataset.
///
/// Invalid rows are dropped silently; only the totals in `CleanStats` reflect
/// them. Sorting is stable, so readings sharing a sensor id and timestamp keep
/// their input order.
pub fn clean<I>(records: I) -> (Dataset, CleanStats)
where
    I: IntoIterator<Item = RawRecord>,
{
    let mut rows_read = 0usize;
    let mut readings: Vec<Reading> = records
        .into_iter()
        .inspect(|_| rows_read += 1)
        .filter_map(to_reading)
        .collect();

    readings.sort_by(|a, b| {
        a.sensor_id
            .cmp(&b.sensor_id)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });

    let stats = CleanStats {
        rows_read,
        rows_kept: readings.len(),
    };
    debug!(
        rows_read = stats.rows_read,
        rows_kept = stats.rows_kept,
        rows_dropped = stats.rows_dropped(),
        "cleaned raw records"
    );

    (Dataset::from_rows(readings), stats)
}
