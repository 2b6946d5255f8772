//! End-of-day report.

use std::fmt::Write as _;

use salonsim_core::SummaryStatistics;

use crate::error::ConfigError;

/// Environment variable selecting the report format (`text` or `json`).
pub const FORMAT_ENV: &str = "SALONSIM_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Invalid(format!(
                "unknown output format '{other}', expected 'text' or 'json'"
            ))),
        }
    }

    /// Reads [`FORMAT_ENV`]; text when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        std::env::var(FORMAT_ENV).map_or(Ok(Self::Text), |value| Self::parse(&value))
    }
}

pub fn render(summary: &SummaryStatistics, format: OutputFormat) -> Result<String, ConfigError> {
    match format {
        OutputFormat::Text => Ok(render_text(summary)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
    }
}

pub fn render_text(summary: &SummaryStatistics) -> String {
    fn or_na(value: Option<f64>, unit: &str) -> String {
        value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}{unit}"))
    }

    let mut out = String::new();
    let _ = writeln!(out, "**************** END OF THE WORKING DAY ****************");
    let _ = writeln!(out);
    let _ = writeln!(out, "Total clients served: {}", summary.clients_served);
    let _ = writeln!(out, "Simulated hours: {:.2} hrs", summary.simulated_minutes / 60.0);
    let _ = writeln!(out);
    let _ = writeln!(out, "Indicators:");
    let _ = writeln!(out, "Average queue length: {}", or_na(summary.average_queue_length, ""));
    let _ = writeln!(out, "Average wait time: {}", or_na(summary.average_wait, " minutes"));
    let _ = writeln!(
        out,
        "Stylist utilization: {}",
        or_na(summary.utilization.map(|u| u * 100.0), "%")
    );
    let _ = write!(out, "95th percentile wait: {}", or_na(summary.p95_wait, " minutes"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> SummaryStatistics {
        SummaryStatistics {
            clients_served: 2,
            servers: 1,
            simulated_minutes: 20.0,
            total_wait_minutes: 5.0,
            total_service_minutes: 20.0,
            average_wait: Some(2.5),
            average_service_time: Some(10.0),
            average_queue_length: Some(0.25),
            utilization: Some(1.0),
            p95_wait: Some(5.0),
            max_wait: Some(5.0),
        }
    }

    #[test]
    fn test_text_report() {
        let text = render_text(&summary());
        assert!(text.contains("Total clients served: 2"));
        assert!(text.contains("Simulated hours: 0.33 hrs"));
        assert!(text.contains("Average queue length: 0.25"));
        assert!(text.contains("Average wait time: 2.50 minutes"));
        assert!(text.contains("Stylist utilization: 100.00%"));
    }

    #[test]
    fn test_text_report_without_data() {
        let empty = SummaryStatistics {
            clients_served: 0,
            simulated_minutes: 0.0,
            average_wait: None,
            average_queue_length: None,
            utilization: None,
            p95_wait: None,
            ..summary()
        };
        let text = render_text(&empty);
        assert!(text.contains("Average wait time: n/a"));
        assert!(text.contains("Average queue length: n/a"));
    }

    #[test]
    fn test_json_report() {
        let json = render(&summary(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["clients_served"], 2);
        assert_eq!(value["average_wait"], 2.5);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::parse("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse(" text ").unwrap(), OutputFormat::Text);
        assert!(OutputFormat::parse("yaml").is_err());
    }
}
