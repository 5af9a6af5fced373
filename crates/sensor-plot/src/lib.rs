//! # Sensor Plot
//!
//! Line charts of a single sensor: the raw value and its rolling average
//! against time. Points without an average leave a gap in that line.

use std::fmt::{self, Write as _};
use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use sensor_pipeline::{AnalyzedReading, AnomalyReport};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("failed to write chart '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to format chart: {0}")]
    Format(#[from] fmt::Error),
}

/// A sink that turns one sensor's series into a picture.
pub trait ChartRenderer {
    fn render(&self, chart: &SeriesChart) -> Result<(), PlotError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub rolling_avg: Option<f64>,
}

impl From<&AnalyzedReading> for ChartPoint {
    fn from(row: &AnalyzedReading) -> Self {
        ChartPoint {
            timestamp: row.reading.timestamp,
            value: row.reading.value,
            rolling_avg: row.rolling_avg,
        }
    }
}

/// The points of one sensor, in time order.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesChart {
    pub sensor_id: String,
    pub points: Vec<ChartPoint>,
}

impl SeriesChart {
    /// Picks `sensor_id` out of the analyzed dataset. An unknown sensor gives
    /// a chart without points.
    pub fn from_report(report: &AnomalyReport, sensor_id: &str) -> Self {
        let points = report
            .dataset()
            .series_for(sensor_id)
            .map(|series| series.iter().map(ChartPoint::from).collect())
            .unwrap_or_default();
        SeriesChart {
            sensor_id: sensor_id.to_string(),
            points,
        }
    }

    pub fn title(&self) -> String {
        format!("Sensor: {}", self.sensor_id)
    }
}

// --- Geometry ---

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: usize = 5;

const VALUE_COLOR: &str = "#1f77b4";
const AVG_COLOR: &str = "#ff7f0e";

#[derive(Debug, Clone, Copy, PartialEq)]
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    /// Spans `values`, widened so a flat or empty series still has height.
    fn spanning(values: impl Iterator<Item = f64>) -> Self {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !min.is_finite() || !max.is_finite() {
            return Range { min: 0.0, max: 1.0 };
        }
        if min == max {
            return Range {
                min: min - 1.0,
                max: max + 1.0,
            };
        }
        let pad = (max - min) * 0.05;
        Range {
            min: min - pad,
            max: max + pad,
        }
    }

    fn fraction(&self, v: f64) -> f64 {
        (v - self.min) / (self.max - self.min)
    }
}

fn seconds(ts: NaiveDateTime) -> f64 {
    ts.and_utc().timestamp_millis() as f64 / 1000.0
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Splits `points` into runs of consecutive defined coordinates.
fn runs(points: impl Iterator<Item = Option<(f64, f64)>>) -> Vec<Vec<(f64, f64)>> {
    let mut runs = vec![Vec::new()];
    for point in points {
        match point {
            Some(p) => {
                if let Some(run) = runs.last_mut() {
                    run.push(p);
                }
            }
            None => runs.push(Vec::new()),
        }
    }
    runs.retain(|run| !run.is_empty());
    runs
}

fn path_data(run: &[(f64, f64)]) -> String {
    run.iter()
        .enumerate()
        .map(|(i, (x, y))| format!("{}{x:.2} {y:.2}", if i == 0 { "M" } else { " L" }))
        .collect()
}

// --- SVG ---

/// Renders charts as standalone SVG files.
#[derive(Debug, Clone)]
pub struct SvgChart {
    path: PathBuf,
    width: f64,
    height: f64,
}

impl SvgChart {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            width: 800.0,
            height: 480.0,
        }
    }

    pub fn to_svg(&self, chart: &SeriesChart) -> Result<String, PlotError> {
        let mut out = String::new();
        self.write_svg(&mut out, chart)?;
        Ok(out)
    }

    fn write_svg(&self, out: &mut String, chart: &SeriesChart) -> fmt::Result {
        let (w, h) = (self.width, self.height);
        let plot_w = w - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = h - MARGIN_TOP - MARGIN_BOTTOM;

        let x_range = Range::spanning(chart.points.iter().map(|p| seconds(p.timestamp)));
        let y_range = Range::spanning(
            chart
                .points
                .iter()
                .flat_map(|p| std::iter::once(p.value).chain(p.rolling_avg)),
        );
        let x_of = |ts: NaiveDateTime| MARGIN_LEFT + x_range.fraction(seconds(ts)) * plot_w;
        let y_of = |v: f64| MARGIN_TOP + (1.0 - y_range.fraction(v)) * plot_h;

        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#
        )?;
        writeln!(out, r#"<rect width="{w}" height="{h}" fill="white"/>"#)?;
        writeln!(
            out,
            r#"<text class="title" x="{:.2}" y="{:.2}" text-anchor="middle" font-size="16">{}</text>"#,
            w / 2.0,
            MARGIN_TOP / 2.0 + 6.0,
            escape(&chart.title())
        )?;

        // Axes
        writeln!(
            out,
            r#"<path class="axes" d="M{MARGIN_LEFT} {MARGIN_TOP} L{MARGIN_LEFT} {:.2} L{:.2} {:.2}" stroke="black" fill="none"/>"#,
            MARGIN_TOP + plot_h,
            MARGIN_LEFT + plot_w,
            MARGIN_TOP + plot_h
        )?;
        for i in 0..=Y_TICKS {
            let v = y_range.min + (y_range.max - y_range.min) * i as f64 / Y_TICKS as f64;
            let y = y_of(v);
            writeln!(
                out,
                r#"<text x="{:.2}" y="{:.2}" text-anchor="end">{v:.1}</text>"#,
                MARGIN_LEFT - 6.0,
                y + 4.0
            )?;
        }
        if let (Some(first), Some(last)) = (chart.points.first(), chart.points.last()) {
            for (ts, anchor) in [(first.timestamp, "start"), (last.timestamp, "end")] {
                writeln!(
                    out,
                    r#"<text x="{:.2}" y="{:.2}" text-anchor="{anchor}">{}</text>"#,
                    x_of(ts),
                    MARGIN_TOP + plot_h + 18.0,
                    ts.format("%Y-%m-%d %H:%M:%S")
                )?;
            }
        }
        writeln!(
            out,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="middle">Time</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            h - 12.0
        )?;
        writeln!(
            out,
            r#"<text x="18" y="{:.2}" text-anchor="middle" transform="rotate(-90 18 {:.2})">Value</text>"#,
            MARGIN_TOP + plot_h / 2.0,
            MARGIN_TOP + plot_h / 2.0
        )?;

        // Series
        let value_line = runs(
            chart
                .points
                .iter()
                .map(|p| Some((x_of(p.timestamp), y_of(p.value)))),
        );
        let avg_line = runs(
            chart
                .points
                .iter()
                .map(|p| p.rolling_avg.map(|a| (x_of(p.timestamp), y_of(a)))),
        );
        for (class, color, lines) in [
            ("series-value", VALUE_COLOR, &value_line),
            ("series-avg", AVG_COLOR, &avg_line),
        ] {
            for run in lines {
                writeln!(
                    out,
                    r#"<path class="{class}" d="{}" stroke="{color}" stroke-width="1.5" fill="none"/>"#,
                    path_data(run)
                )?;
            }
        }

        // Legend
        let lx = MARGIN_LEFT + plot_w - 110.0;
        for (i, (label, color)) in [("value", VALUE_COLOR), ("rolling avg", AVG_COLOR)]
            .into_iter()
            .enumerate()
        {
            let ly = MARGIN_TOP + 14.0 + i as f64 * 16.0;
            writeln!(
                out,
                r#"<path d="M{lx:.2} {ly:.2} L{:.2} {ly:.2}" stroke="{color}" stroke-width="2"/>"#,
                lx + 20.0
            )?;
            writeln!(
                out,
                r#"<text class="legend" x="{:.2}" y="{:.2}">{label}</text>"#,
                lx + 26.0,
                ly + 4.0
            )?;
        }

        writeln!(out, "</svg>")
    }
}

impl ChartRenderer for SvgChart {
    fn render(&self, chart: &SeriesChart) -> Result<(), PlotError> {
        if chart.points.is_empty() {
            warn!(sensor_id = %chart.sensor_id, "no readings to plot");
        }
        let svg = self.to_svg(chart)?;

        let write_err = |source: io::Error| PlotError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&self.path, svg).map_err(write_err)?;

        debug!(
            sensor_id = %chart.sensor_id,
            points = chart.points.len(),
            path = %self.path.display(),
            "rendered chart"
        );
        Ok(())
    }
}
