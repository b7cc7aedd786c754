//! Core sample types
//!
//! A `Sample` is the immutable record produced by one successful poll of a
//! collector: a timestamp plus named numeric fields.

use crate::extract::Extraction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp type for consistent time handling across the crate
pub type Timestamp = DateTime<Utc>;

/// One timestamped snapshot of a metric's fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// When the sample was taken
    timestamp: Timestamp,
    /// Field name to value, e.g. `user`, `system`, `idle` for CPU
    fields: BTreeMap<String, f64>,
}

impl Sample {
    /// Create a sample stamped with the current time
    pub fn new(fields: BTreeMap<String, f64>) -> Self {
        Self::at(Utc::now(), fields)
    }

    pub fn at(timestamp: Timestamp, fields: BTreeMap<String, f64>) -> Self {
        Self { timestamp, fields }
    }

    /// Build a sample from the fields an extraction actually resolved
    ///
    /// Missing and malformed fields are left out rather than stored as
    /// their fallback.
    pub fn from_extraction(timestamp: Timestamp, extraction: &Extraction) -> Self {
        Self::at(timestamp, extraction.known_values())
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::SilentDiagnostics;
    use crate::extract::{FieldPattern, MetricExtractor};
    use std::sync::Arc;

    fn memory_fields() -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("total".to_string(), 3_809_036.0),
            ("free".to_string(), 120_312.0),
            ("kernel_stack".to_string(), 9_872.0),
        ])
    }

    #[test]
    fn test_sample_accessors() {
        let sample = Sample::new(memory_fields());
        assert_eq!(sample.get("total"), Some(3_809_036.0));
        assert_eq!(sample.get("swap"), None);
        assert_eq!(sample.len(), 3);
        assert!(!sample.is_empty());

        let names: Vec<&str> = sample.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["free", "kernel_stack", "total"]);
    }

    #[test]
    fn test_sample_serialization() {
        let sample = Sample::new(memory_fields());
        let json = serde_json::to_string(&sample).unwrap();
        let deserialized: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample, deserialized);
    }

    #[test]
    fn test_sample_timestamp_is_preserved() {
        let when = Utc::now() - chrono::Duration::seconds(30);
        let sample = Sample::at(when, BTreeMap::new());
        assert_eq!(sample.timestamp(), when);
        assert!(sample.is_empty());
    }

    #[test]
    fn test_from_extraction_skips_fallback_fields() {
        let patterns = vec![
            FieldPattern::new("total", &[r"MemTotal:\s+\d+"]).unwrap(),
            FieldPattern::new("free", &[r"MemFree:\s+\d+"]).unwrap(),
        ];
        let extraction =
            MetricExtractor::new(Arc::new(SilentDiagnostics)).extract("MemTotal: 2048 kB", &patterns);

        let sample = Sample::from_extraction(Utc::now(), &extraction);
        assert_eq!(sample.get("total"), Some(2048.0));
        assert_eq!(sample.get("free"), None);
        assert_eq!(sample.len(), 1);
    }
}
