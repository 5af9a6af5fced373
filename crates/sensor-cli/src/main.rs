//! sensor-processor - batch cleaning, smoothing and anomaly flagging of
//! sensor readings
//!
//! Without arguments the processor reads `data/sensors_raw.csv`, writes
//! `outputs/cleaned.csv`, `outputs/out_of_range.csv`, `outputs/spikes.csv`
//! and a chart of `temp_1`, then prints the row counts.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use sensor_cli::{process, RunConfig, SummaryFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sensor processor CLI
#[derive(Parser)]
#[command(name = "sensor-processor")]
#[command(about = "Clean sensor readings, smooth them and flag anomalies", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Raw input CSV
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Sensor to chart
    #[arg(long)]
    plot_sensor: Option<String>,

    /// Skip the chart
    #[arg(long)]
    no_plot: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    log_json: bool,

    /// Console summary format
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    summary_format: SummaryFormat,
}

fn init_tracing(cli: &Cli) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    // Logs go to stderr; stdout carries the summary only.
    if cli.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = RunConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(input) = cli.input {
        config.input = input;
    }
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(plot_sensor) = cli.plot_sensor {
        config.plot_sensor = plot_sensor;
    }
    if cli.no_plot {
        config.plot = false;
    }

    let summary = process(&config)?;
    println!("{}", summary.render(cli.summary_format)?);
    Ok(())
}
