//! # Sensor CLI
//!
//! Wires the loader, the processing pipeline, the CSV reports and the chart
//! into one batch run.

pub mod config;
pub mod summary;

pub use config::RunConfig;
pub use summary::{Summary, SummaryFormat};

use anyhow::{Context, Result};
use sensor_csv::{load_records, write_report};
use sensor_plot::{ChartRenderer, SeriesChart, SvgChart};
use tracing::info;

/// Runs the whole batch: load, process, write the three reports and the chart.
///
/// Reports and chart are written independently; if any of them fails the
/// others are still attempted and the first failure is returned afterwards.
pub fn process(config: &RunConfig) -> Result<Summary> {
    let records = load_records(&config.input)
        .with_context(|| format!("failed to load '{}'", config.input.display()))?;

    let outcome = sensor_pipeline::run(records, &config.pipeline)
        .context("invalid pipeline configuration")?;

    let reports = write_report(&config.report_files(), &outcome.report)
        .with_context(|| format!("failed to write reports to '{}'", config.output_dir.display()));

    let chart = if config.plot {
        let chart = SeriesChart::from_report(&outcome.report, &config.plot_sensor);
        let renderer = SvgChart::new(config.plot_path());
        renderer
            .render(&chart)
            .with_context(|| format!("failed to plot sensor '{}'", config.plot_sensor))
    } else {
        Ok(())
    };

    reports?;
    chart?;

    info!(output_dir = %config.output_dir.display(), "run complete");
    Ok(Summary::from(&outcome))
}
