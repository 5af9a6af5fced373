//! # Detect
//!
//! Attaches the per-series delta to every smoothed reading and derives the
//! two anomaly views: out-of-range values and spikes. The views are
//! independent and may share rows.

use chrono::NaiveDateTime;
use sensor_core::{Dataset, PipelineConfig, Reading, SensorObservation};
use tracing::debug;

use crate::smooth::SmoothedReading;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedReading {
    pub reading: Reading,
    pub rolling_avg: Option<f64>,
    /// Absolute change from the previous reading of the same sensor, `None`
    /// at the start of a series.
    pub delta: Option<f64>,
}

impl SensorObservation for AnalyzedReading {
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

/// Which rule flagged a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    OutOfRange,
    Spike,
}

/// The analyzed dataset and the two flag views over it.
///
/// Flags are kept as row positions into `dataset`, in dataset order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnomalyReport {
    dataset: Dataset<AnalyzedReading>,
    out_of_range: Vec<usize>,
    spikes: Vec<usize>,
}

impl AnomalyReport {
    pub fn dataset(&self) -> &Dataset<AnalyzedReading> {
        &self.dataset
    }

    pub fn out_of_range(&self) -> impl Iterator<Item = &AnalyzedReading> + '_ {
        self.flagged(AnomalyKind::OutOfRange)
    }

    pub fn spikes(&self) -> impl Iterator<Item = &AnalyzedReading> + '_ {
        self.flagged(AnomalyKind::Spike)
    }

    pub fn flagged(&self, kind: AnomalyKind) -> impl Iterator<Item = &AnalyzedReading> + '_ {
        let rows = self.dataset.rows();
        self.indices(kind).iter().map(move |&i| &rows[i])
    }

    pub fn indices(&self, kind: AnomalyKind) -> &[usize] {
        match kind {
            AnomalyKind::OutOfRange => &self.out_of_range,
            AnomalyKind::Spike => &self.spikes,
        }
    }

    pub fn out_of_range_count(&self) -> usize {
        self.out_of_range.len()
    }

    pub fn spike_count(&self) -> usize {
        self.spikes.len()
    }
}

/// Computes deltas per series and flags anomalies under `config`.
pub fn detect(dataset: &Dataset<SmoothedReading>, config: &PipelineConfig) -> AnomalyReport {
    let mut rows = Vec::with_capacity(dataset.len());

    for series in dataset.series() {
        let mut previous: Option<f64> = None;
        for row in series.iter() {
            let delta = previous.map(|p| (row.value() - p).abs());
            previous = Some(row.value());
            rows.push(AnalyzedReading {
                reading: row.reading.clone(),
                rolling_avg: row.rolling_avg,
                delta,
            });
        }
    }

    let out_of_range: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| config.is_out_of_range(r.value()))
        .map(|(i, _)| i)
        .collect();

    let spikes: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r.delta.is_some_and(|d| config.is_spike(d)))
        .map(|(i, _)| i)
        .collect();

    debug!(
        rows = rows.len(),
        out_of_range = out_of_range.len(),
        spikes = spikes.len(),
        "flagged anomalies"
    );

    AnomalyReport {
        dataset: Dataset::from_rows(rows),
        out_of_range,
        spikes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smooth::smooth;
    use chrono::NaiveDate;

    fn reading(sensor_id: &str, minute: u32, value: f64) -> Reading {
        Reading {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, minute, 0)
                .unwrap(),
            sensor_id: sensor_id.to_string(),
            value,
        }
    }

    fn analyze(rows: Vec<Reading>, config: &PipelineConfig) -> AnomalyReport {
        let ds = Dataset::from_rows(rows);
        detect(&smooth(&ds, config.window), config)
    }

    fn values<'a>(rows: impl Iterator<Item = &'a AnalyzedReading>) -> Vec<f64> {
        rows.map(|r| r.reading.value).collect()
    }

    #[test]
    fn deltas_restart_per_series() {
        let report = analyze(
            vec![
                reading("a", 0, 10.0),
                reading("a", 1, 4.0),
                reading("b", 0, 50.0),
                reading("b", 1, 52.5),
            ],
            &PipelineConfig::default(),
        );

        let deltas: Vec<Option<f64>> = report.dataset().iter().map(|r| r.delta).collect();
        assert_eq!(deltas, vec![None, Some(6.0), None, Some(2.5)]);
    }

    #[test]
    fn out_of_range_excludes_boundaries() {
        let report = analyze(
            vec![
                reading("s", 0, -0.5),
                reading("s", 1, 0.0),
                reading("s", 2, 100.0),
                reading("s", 3, 100.5),
            ],
            &PipelineConfig::default(),
        );

        assert_eq!(values(report.out_of_range()), vec![-0.5, 100.5]);
        assert_eq!(report.indices(AnomalyKind::OutOfRange), &[0, 3]);
    }

    #[test]
    fn spike_threshold_is_strict() {
        let report = analyze(
            vec![
                reading("s", 0, 0.0),
                reading("s", 1, 30.0),
                reading("s", 2, 60.5),
            ],
            &PipelineConfig::default(),
        );

        assert_eq!(values(report.spikes()), vec![60.5]);
        assert_eq!(report.spike_count(), 1);
    }

    #[test]
    fn series_start_is_never_a_spike() {
        // "b" starts 90 below the last "a" reading.
        let report = analyze(
            vec![reading("a", 0, 95.0), reading("b", 0, 5.0)],
            &PipelineConfig::default(),
        );

        assert_eq!(report.spike_count(), 0);
    }

    #[test]
    fn a_reading_can_carry_both_flags() {
        let report = analyze(
            vec![reading("s", 0, 50.0), reading("s", 1, 150.0)],
            &PipelineConfig::default(),
        );

        assert_eq!(report.indices(AnomalyKind::OutOfRange), &[1]);
        assert_eq!(report.indices(AnomalyKind::Spike), &[1]);
    }

    #[test]
    fn thresholds_come_from_config() {
        let config = PipelineConfig {
            range_min: -10.0,
            range_max: 10.0,
            spike_threshold: 5.0,
            ..Default::default()
        };
        let report = analyze(
            vec![reading("s", 0, -5.0), reading("s", 1, 2.0), reading("s", 2, 12.0)],
            &config,
        );

        assert_eq!(values(report.out_of_range()), vec![12.0]);
        assert_eq!(values(report.spikes()), vec![2.0, 12.0]);
    }

    #[test]
    fn empty_input_gives_empty_views() {
        let report = detect(&Dataset::default(), &PipelineConfig::default());
        assert!(report.dataset().is_empty());
        assert_eq!(report.out_of_range().count(), 0);
        assert_eq!(report.spikes().count(), 0);
    }
}
