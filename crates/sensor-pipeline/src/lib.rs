//! # Sensor Pipeline
//!
//! The batch processing chain: `clean` → `smooth` → `detect`. Every stage
//! takes the previous stage's output by reference and returns a new
//! structure, so each one can be exercised on its own.

pub mod clean;
pub mod detect;
pub mod smooth;

pub use clean::{CleanStats, clean, coerce_value};
pub use detect::{AnalyzedReading, AnomalyKind, AnomalyReport, detect};
pub use smooth::{SmoothedReading, smooth};

use sensor_core::{ConfigError, PipelineConfig, RawRecord};
use tracing::info;

/// Result of a full pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub stats: CleanStats,
    pub report: AnomalyReport,
}

/// Runs the whole chain over loader output.
///
/// Only an invalid `config` fails; row-level problems are absorbed by the
/// cleaner and an empty input produces an empty report.
pub fn run<I>(records: I, config: &PipelineConfig) -> Result<PipelineOutcome, ConfigError>
where
    I: IntoIterator<Item = RawRecord>,
{
    config.validate()?;

    let (cleaned, stats) = clean(records);
    let smoothed = smooth(&cleaned, config.window);
    let report = detect(&smoothed, config);

    info!(
        rows_processed = report.dataset().len(),
        rows_dropped = stats.rows_dropped(),
        out_of_range = report.out_of_range_count(),
        spikes = report.spike_count(),
        "pipeline finished"
    );

    Ok(PipelineOutcome { stats, report })
}
