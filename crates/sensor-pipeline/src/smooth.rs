//! # Smooth
//!
//! Per-sensor trailing rolling mean. A window is only evaluated once it is
//! full, so the leading `window - 1` readings of every series carry no
//! average.

use chrono::NaiveDateTime;
use sensor_core::{Dataset, Reading, SensorObservation};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedReading {
    pub reading: Reading,
    /// Mean over the trailing window, `None` until the window is full.
    pub rolling_avg: Option<f64>,
}

impl SensorObservation for SmoothedReading {
    fn sensor_id(&self) -> &str {
        &self.reading.sensor_id
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.reading.timestamp
    }

    fn value(&self) -> f64 {
        self.reading.value
    }
}

/// Mean of the `window` values ending at `end` (inclusive).
fn trailing_mean(values: &[f64], end: usize, window: usize) -> Option<f64> {
    if window == 0 || end + 1 < window {
        return None;
    }
    let slice = &values[end + 1 - window..=end];
    Some(slice.iter().sum::<f64>() / window as f64)
}

/// Computes the rolling mean of every series independently.
///
/// Rows keep their order; nothing is dropped.
pub fn smooth(dataset: &Dataset, window: usize) -> Dataset<SmoothedReading> {
    let mut rows = Vec::with_capacity(dataset.len());

    for series in dataset.series() {
        let values: Vec<f64> = series.iter().map(|r| r.value).collect();
        rows.extend(series.iter().enumerate().map(|(i, reading)| SmoothedReading {
            reading: reading.clone(),
            rolling_avg: trailing_mean(&values, i, window),
        }));
    }

    let with_avg = rows.iter().filter(|r| r.rolling_avg.is_some()).count();
    debug!(rows = rows.len(), with_avg, window, "computed rolling averages");

    Dataset::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn reading(sensor_id: &str, second: u32, value: f64) -> Reading {
        Reading {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, second)
                .unwrap(),
            sensor_id: sensor_id.to_string(),
            value,
        }
    }

    fn averages(ds: &Dataset<SmoothedReading>) -> Vec<Option<f64>> {
        ds.iter().map(|r| r.rolling_avg).collect()
    }

    #[test]
    fn window_of_two_averages_with_predecessor() {
        let ds = Dataset::from_rows(vec![
            reading("s1", 0, 10.0),
            reading("s1", 1, 20.0),
            reading("s1", 2, 50.0),
        ]);

        let smoothed = smooth(&ds, 2);

        assert_eq!(averages(&smoothed), vec![None, Some(15.0), Some(35.0)]);
    }

    #[test]
    fn series_start_is_undefined_for_every_sensor() {
        let ds = Dataset::from_rows(vec![
            reading("a", 0, 1.0),
            reading("a", 1, 3.0),
            reading("b", 0, 100.0),
            reading("b", 1, 0.0),
        ]);

        let smoothed = smooth(&ds, 2);

        assert_eq!(averages(&smoothed), vec![None, Some(2.0), None, Some(50.0)]);
    }

    #[test]
    fn larger_window_waits_until_full() {
        let ds = Dataset::from_rows(vec![
            reading("s", 0, 1.0),
            reading("s", 1, 2.0),
            reading("s", 2, 3.0),
            reading("s", 3, 10.0),
        ]);

        let smoothed = smooth(&ds, 3);
        let avg = averages(&smoothed);

        assert_eq!(avg[0], None);
        assert_eq!(avg[1], None);
        assert_relative_eq!(avg[2].unwrap(), 2.0);
        assert_relative_eq!(avg[3].unwrap(), 5.0);
    }

    #[test]
    fn window_of_one_is_the_value_itself() {
        let ds = Dataset::from_rows(vec![reading("s", 0, 4.5), reading("s", 1, -1.0)]);
        assert_eq!(averages(&smooth(&ds, 1)), vec![Some(4.5), Some(-1.0)]);
    }

    #[test]
    fn keeps_rows_and_order() {
        let ds = Dataset::from_rows(vec![reading("a", 0, 1.0), reading("b", 0, 2.0)]);
        let smoothed = smooth(&ds, 2);

        let kept: Vec<&Reading> = smoothed.iter().map(|r| &r.reading).collect();
        let original: Vec<&Reading> = ds.iter().collect();
        assert_eq!(kept, original);
    }

    #[test]
    fn empty_dataset_smooths_to_empty() {
        let ds: Dataset = Dataset::default();
        assert!(smooth(&ds, 2).is_empty());
    }
}
