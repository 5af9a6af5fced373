//! Row counts printed at the end of a run

use clap::ValueEnum;
use sensor_pipeline::PipelineOutcome;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SummaryFormat {
    /// One human-readable line per count
    #[default]
    Text,
    /// A single JSON object
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub rows_processed: usize,
    pub out_of_range_alerts: usize,
    pub spike_alerts: usize,
}

impl From<&PipelineOutcome> for Summary {
    fn from(outcome: &PipelineOutcome) -> Self {
        Summary {
            rows_read: outcome.stats.rows_read,
            rows_dropped: outcome.stats.rows_dropped(),
            rows_processed: outcome.report.dataset().len(),
            out_of_range_alerts: outcome.report.out_of_range_count(),
            spike_alerts: outcome.report.spike_count(),
        }
    }
}

impl Summary {
    pub fn to_text(&self) -> String {
        format!(
            "Processing complete\n\
             Rows processed: {}\n\
             Out-of-range alerts: {}\n\
             Spike alerts: {}",
            self.rows_processed, self.out_of_range_alerts, self.spike_alerts
        )
    }

    pub fn render(&self, format: SummaryFormat) -> serde_json::Result<String> {
        match format {
            SummaryFormat::Text => Ok(self.to_text()),
            SummaryFormat::Json => serde_json::to_string(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> Summary {
        Summary {
            rows_read: 5,
            rows_dropped: 1,
            rows_processed: 4,
            out_of_range_alerts: 2,
            spike_alerts: 3,
        }
    }

    #[test]
    fn text_has_one_line_per_count() {
        let text = summary().render(SummaryFormat::Text).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec![
                "Processing complete",
                "Rows processed: 4",
                "Out-of-range alerts: 2",
                "Spike alerts: 3",
            ]
        );
    }

    #[test]
    fn json_carries_every_count() {
        let json = summary().render(SummaryFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rows_read"], 5);
        assert_eq!(value["rows_dropped"], 1);
        assert_eq!(value["rows_processed"], 4);
        assert_eq!(value["out_of_range_alerts"], 2);
        assert_eq!(value["spike_alerts"], 3);
    }
}
