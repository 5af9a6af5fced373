//! Configuration for a processor run

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sensor_core::PipelineConfig;
use sensor_csv::ReportFiles;
use serde::{Deserialize, Serialize};

/// Paths, plot target and pipeline settings of one run.
///
/// Every field has a default, so an empty (or absent) config file runs the
/// processor with its fixed layout: `data/sensors_raw.csv` in, `outputs/` out,
/// chart of `temp_1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Raw input CSV
    pub input: PathBuf,

    /// Directory receiving the report files and the chart
    pub output_dir: PathBuf,

    /// Sensor whose series is charted
    pub plot_sensor: String,

    /// Render the chart at all
    pub plot: bool,

    /// Window size and anomaly thresholds
    pub pipeline: PipelineConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/sensors_raw.csv"),
            output_dir: PathBuf::from("outputs"),
            plot_sensor: "temp_1".to_string(),
            plot: true,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl RunConfig {
    /// Loads a TOML config file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config '{}'", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.pipeline.validate()?;
        Ok(config)
    }

    pub fn report_files(&self) -> ReportFiles {
        ReportFiles::in_dir(&self.output_dir)
    }

    /// `<output_dir>/<plot_sensor>.svg`, with characters that are unsafe in
    /// file names replaced by `_`.
    pub fn plot_path(&self) -> PathBuf {
        let stem: String = self
            .plot_sensor
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.output_dir.join(format!("{stem}.svg"))
    }
}
