//! Structured, human-readable collector summaries

use crate::samples::Timestamp;
use crate::units::{self, SizeUnit};
use serde::Serialize;
use std::fmt;

/// A single value in a summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SummaryValue {
    Text(String),
    Number(f64),
    Percent(f64),
    /// Byte count, rendered with automatic scale selection
    Bytes(i64),
    Flag(bool),
    /// The value was never obtained or extraction failed
    Unknown,
}

impl SummaryValue {
    /// `Percent` for a known value, `Unknown` otherwise
    pub fn percent_or_unknown(value: Option<f64>) -> Self {
        value.map_or(SummaryValue::Unknown, SummaryValue::Percent)
    }

    /// `Text` for a known value, `Unknown` otherwise
    pub fn text_or_unknown(value: Option<&str>) -> Self {
        value.map_or(SummaryValue::Unknown, |v| SummaryValue::Text(v.to_string()))
    }

    /// `Bytes` for a known value, `Unknown` otherwise
    pub fn bytes_or_unknown(value: Option<i64>) -> Self {
        value.map_or(SummaryValue::Unknown, SummaryValue::Bytes)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, SummaryValue::Unknown)
    }

    /// Render the value, scaling byte counts with `unit`
    pub fn render(&self, unit: SizeUnit) -> String {
        match self {
            SummaryValue::Text(text) => text.clone(),
            SummaryValue::Number(n) => format!("{}", n),
            SummaryValue::Percent(p) => format!("{:.1}%", p),
            SummaryValue::Bytes(b) => {
                units::convert(*b, unit).unwrap_or_else(|| "unknown".to_string())
            }
            SummaryValue::Flag(f) => f.to_string(),
            SummaryValue::Unknown => "unknown".to_string(),
        }
    }
}

/// Labelled summary line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub label: String,
    pub value: SummaryValue,
}

/// Rendered state of one collector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Heading, e.g. "CPU Information"
    pub title: String,
    /// When the underlying state was last refreshed, `None` before the first poll
    pub polled_at: Option<Timestamp>,
    pub entries: Vec<SummaryEntry>,
}

impl Summary {
    pub fn new(title: impl Into<String>, polled_at: Option<Timestamp>) -> Self {
        Self {
            title: title.into(),
            polled_at,
            entries: Vec::new(),
        }
    }

    /// Append an entry; chainable
    pub fn entry(mut self, label: impl Into<String>, value: SummaryValue) -> Self {
        self.push(label, value);
        self
    }

    pub fn push(&mut self, label: impl Into<String>, value: SummaryValue) {
        self.entries.push(SummaryEntry {
            label: label.into(),
            value,
        });
    }

    /// Value of the first entry with `label`
    pub fn get(&self, label: &str) -> Option<&SummaryValue> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| &e.value)
    }

    /// Multi-line text rendering with byte counts scaled by `unit`
    pub fn render(&self, unit: SizeUnit) -> String {
        let mut out = format!("{}:\n", self.title);
        match self.polled_at {
            Some(ts) => out.push_str(&format!("Polled at: {}\n", ts.to_rfc3339())),
            None => out.push_str("Polled at: never\n"),
        }
        for entry in &self.entries {
            out.push_str(&format!("{}: {}\n", entry.label, entry.value.render(unit)));
        }
        out
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(SizeUnit::Auto))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_render_before_first_poll() {
        let summary = Summary::new("CPU Information", None)
            .entry("User CPU", SummaryValue::Unknown);

        assert_eq!(
            summary.to_string(),
            "CPU Information:\nPolled at: never\nUser CPU: unknown\n"
        );
    }

    #[test]
    fn test_render_values() {
        let ts = Utc.with_ymd_and_hms(2024, 12, 9, 18, 30, 45).unwrap();
        let summary = Summary::new("Storage", Some(ts))
            .entry("Available", SummaryValue::Bytes(1536))
            .entry("Writeable", SummaryValue::Flag(true))
            .entry("Used", SummaryValue::Percent(12.34))
            .entry("Location", SummaryValue::Text("/data".to_string()));

        let text = summary.render(SizeUnit::Auto);
        assert!(text.contains("Polled at: 2024-12-09T18:30:45+00:00"));
        assert!(text.contains("Available: 1.50 KB"));
        assert!(text.contains("Writeable: true"));
        assert!(text.contains("Used: 12.3%"));
        assert!(text.contains("Location: /data"));
    }

    #[test]
    fn test_negative_bytes_render_as_unknown() {
        assert_eq!(SummaryValue::Bytes(-1).render(SizeUnit::Auto), "unknown");
    }

    #[test]
    fn test_or_unknown_helpers() {
        assert!(SummaryValue::percent_or_unknown(None).is_unknown());
        assert_eq!(
            SummaryValue::percent_or_unknown(Some(5.0)),
            SummaryValue::Percent(5.0)
        );
        assert!(SummaryValue::text_or_unknown(None).is_unknown());
        assert_eq!(
            SummaryValue::bytes_or_unknown(Some(10)),
            SummaryValue::Bytes(10)
        );
    }

    #[test]
    fn test_get_entry() {
        let summary = Summary::new("Battery", None).entry("Is Charging", SummaryValue::Flag(false));
        assert_eq!(summary.get("Is Charging"), Some(&SummaryValue::Flag(false)));
        assert_eq!(summary.get("Missing"), None);
    }

    #[test]
    fn test_summary_value_serialization() {
        assert_eq!(
            serde_json::to_string(&SummaryValue::Percent(5.5)).unwrap(),
            r#"{"kind":"percent","value":5.5}"#
        );
        assert_eq!(
            serde_json::to_string(&SummaryValue::Unknown).unwrap(),
            r#"{"kind":"unknown"}"#
        );
    }
}
