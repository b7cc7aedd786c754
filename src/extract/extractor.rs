use super::pattern::FieldPattern;
use crate::diagnostics::Diagnostics;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of resolving a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    /// An alternative matched and the value parsed
    Parsed,
    /// No alternative matched; the fallback was used
    Missing,
    /// An alternative matched but the value could not be coerced; the fallback was used
    Malformed,
    /// Computed from other fields after extraction
    Derived,
}

/// A resolved field value together with how it was obtained
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedField {
    pub value: f64,
    pub status: FieldStatus,
    /// Substring that matched, if any
    pub matched: Option<String>,
}

impl ExtractedField {
    /// True when the value came from the text (or was derived from it)
    pub fn is_present(&self) -> bool {
        matches!(self.status, FieldStatus::Parsed | FieldStatus::Derived)
    }

    /// The value, or `None` when only the fallback is available
    pub fn known(&self) -> Option<f64> {
        self.is_present().then_some(self.value)
    }
}

/// Result of running a pattern table over a text blob
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    fields: BTreeMap<String, ExtractedField>,
}

impl Extraction {
    pub fn get(&self, name: &str) -> Option<&ExtractedField> {
        self.fields.get(name)
    }

    /// Field value, falling back to zero for names that were never requested
    pub fn value(&self, name: &str) -> f64 {
        self.fields.get(name).map(|f| f.value).unwrap_or(0.0)
    }

    pub fn status(&self, name: &str) -> Option<FieldStatus> {
        self.fields.get(name).map(|f| f.status)
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(ExtractedField::is_present)
    }

    /// True when at least one direct field parsed successfully
    pub fn matched_any(&self) -> bool {
        self.fields
            .values()
            .any(|f| f.status == FieldStatus::Parsed)
    }

    /// Record a value computed from the already resolved fields
    ///
    /// The result is stored as-is; no clamping is applied.
    pub fn derive<F>(&mut self, name: &str, compute: F) -> f64
    where
        F: FnOnce(&Extraction) -> f64,
    {
        let value = compute(self);
        self.fields.insert(
            name.to_string(),
            ExtractedField {
                value,
                status: FieldStatus::Derived,
                matched: None,
            },
        );
        value
    }

    /// Like `derive`, but only when every field in `inputs` is present
    ///
    /// Returns `None` and records nothing when an input fell back.
    pub fn derive_from<F>(&mut self, name: &str, inputs: &[&str], compute: F) -> Option<f64>
    where
        F: FnOnce(&Extraction) -> f64,
    {
        if !inputs.iter().all(|input| self.is_present(input)) {
            return None;
        }
        Some(self.derive(name, compute))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtractedField)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Plain name to value map, fallbacks included
    pub fn values(&self) -> BTreeMap<String, f64> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.value))
            .collect()
    }

    /// Name to value map of present fields only
    pub fn known_values(&self) -> BTreeMap<String, f64> {
        self.fields
            .iter()
            .filter_map(|(k, v)| v.known().map(|value| (k.clone(), value)))
            .collect()
    }
}

/// Tolerant numeric field extractor
///
/// Every field in the table is resolved independently: a field that is
/// absent or malformed takes its fallback and extraction carries on with the
/// remaining fields.
#[derive(Clone)]
pub struct MetricExtractor {
    diagnostics: Arc<dyn Diagnostics>,
}

impl MetricExtractor {
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self { diagnostics }
    }

    /// Resolve every pattern in `patterns` against `raw`
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use devprobe::diagnostics::SilentDiagnostics;
    /// use devprobe::extract::{FieldPattern, MetricExtractor};
    ///
    /// let extractor = MetricExtractor::new(Arc::new(SilentDiagnostics));
    /// let patterns = vec![FieldPattern::new("user", &[r"(?i)user\s+\d+(\.\d+)?%"]).unwrap()];
    /// let result = extractor.extract("User 12.5%, System 3%", &patterns);
    /// assert_eq!(result.value("user"), 12.5);
    /// ```
    pub fn extract(&self, raw: &str, patterns: &[FieldPattern]) -> Extraction {
        let mut extraction = Extraction::default();

        if raw.trim().is_empty() {
            self.diagnostics
                .info("No text available to parse, using fallbacks for every field");
        }

        for pattern in patterns {
            let field = self.resolve(raw, pattern);
            extraction.fields.insert(pattern.name().to_string(), field);
        }

        extraction
    }

    fn resolve(&self, raw: &str, pattern: &FieldPattern) -> ExtractedField {
        let Some(matched) = pattern.find(raw) else {
            self.diagnostics
                .debug(&format!("No match for field '{}'", pattern.name()));
            return ExtractedField {
                value: pattern.fallback(),
                status: FieldStatus::Missing,
                matched: None,
            };
        };

        self.diagnostics
            .debug(&format!("Found {}: {}", pattern.name(), matched));

        match pattern.coercion().apply(matched) {
            Some(value) => ExtractedField {
                value,
                status: FieldStatus::Parsed,
                matched: Some(matched.to_string()),
            },
            None => {
                self.diagnostics.error(&format!(
                    "Could not parse a number for field '{}' from '{}'",
                    pattern.name(),
                    matched
                ));
                ExtractedField {
                    value: pattern.fallback(),
                    status: FieldStatus::Malformed,
                    matched: Some(matched.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{MockDiagnostics, RecordingDiagnostics, SilentDiagnostics};
    use crate::extract::pattern::Coercion;

    fn cpu_patterns() -> Vec<FieldPattern> {
        vec![
            FieldPattern::new(
                "user",
                &[
                    r"(?i)\buse?r\s+\d{1,3}(?:\.\d{1,2})?%",
                    r"(?i)\d{1,3}(?:\.\d{1,2})?%\s*use?r\b",
                ],
            )
            .unwrap(),
            FieldPattern::new(
                "system",
                &[
                    r"(?i)\bsys(?:tem)?\s+\d{1,3}(?:\.\d{1,2})?%",
                    r"(?i)\d{1,3}(?:\.\d{1,2})?%\s*sys(?:tem)?\b",
                ],
            )
            .unwrap(),
        ]
    }

    fn silent() -> MetricExtractor {
        MetricExtractor::new(Arc::new(SilentDiagnostics))
    }

    #[test]
    fn test_extracts_both_formats() {
        let extractor = silent();
        let a = extractor.extract("User 12.3%, System 4%", &cpu_patterns());
        let b = extractor.extract("CPU usage: 12.3% user, 4.0% sys, 83.7% idle", &cpu_patterns());

        assert_eq!(a.value("user"), 12.3);
        assert_eq!(b.value("user"), 12.3);
        assert_eq!(a.value("system"), 4.0);
        assert_eq!(b.value("system"), 4.0);
    }

    #[test]
    fn test_missing_field_uses_fallback_and_continues() {
        let extractor = silent();
        let result = extractor.extract("System 21%", &cpu_patterns());

        assert_eq!(result.status("user"), Some(FieldStatus::Missing));
        assert_eq!(result.value("user"), 0.0);
        assert_eq!(result.status("system"), Some(FieldStatus::Parsed));
        assert_eq!(result.value("system"), 21.0);
        assert!(result.matched_any());
    }

    #[test]
    fn test_empty_text_marks_everything_missing() {
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let extractor = MetricExtractor::new(diagnostics.clone());
        let result = extractor.extract("", &cpu_patterns());

        assert_eq!(result.len(), 2);
        assert!(!result.matched_any());
        assert!(!result.is_present("user"));
        assert!(!result.is_present("system"));
        assert_eq!(diagnostics.count(log::Level::Info), 1);
    }

    #[test]
    fn test_absence_distinguishable_from_zero() {
        let extractor = silent();
        let zero = extractor.extract("User 0%", &cpu_patterns());
        let absent = extractor.extract("", &cpu_patterns());

        assert_eq!(zero.value("user"), absent.value("user"));
        assert!(zero.is_present("user"));
        assert!(!absent.is_present("user"));
        assert_eq!(zero.get("user").unwrap().known(), Some(0.0));
        assert_eq!(absent.get("user").unwrap().known(), None);
    }

    #[test]
    fn test_malformed_match_falls_back_and_reports_error() {
        let patterns = vec![
            FieldPattern::new("version", &[r"version\s+[\d.]+"])
                .unwrap()
                .with_fallback(-1.0),
            FieldPattern::new("total", &[r"total\s+\d+"])
                .unwrap()
                .with_coercion(Coercion::Integer),
        ];

        let mut mock = MockDiagnostics::new();
        mock.expect_debug().return_const(());
        mock.expect_info().never();
        mock.expect_error()
            .withf(|message| message.contains("version"))
            .times(1)
            .return_const(());

        let extractor = MetricExtractor::new(Arc::new(mock));
        let result = extractor.extract("version 1.2.3\ntotal 42", &patterns);

        assert_eq!(result.status("version"), Some(FieldStatus::Malformed));
        assert_eq!(result.value("version"), -1.0);
        assert_eq!(result.get("version").unwrap().matched.as_deref(), Some("version 1.2.3"));
        assert_eq!(result.value("total"), 42.0);
    }

    #[test]
    fn test_derived_value_is_not_clamped() {
        let extractor = silent();
        let mut result = extractor.extract("User 80%, System 45%", &cpu_patterns());
        let idle = result.derive("idle", |e| 100.0 - e.value("user") - e.value("system"));

        assert_eq!(idle, -25.0);
        assert_eq!(result.status("idle"), Some(FieldStatus::Derived));
        assert!(result.is_present("idle"));
    }

    #[test]
    fn test_values_map_includes_fallbacks() {
        let extractor = silent();
        let result = extractor.extract("User 5%", &cpu_patterns());
        let values = result.values();

        assert_eq!(values.get("user"), Some(&5.0));
        assert_eq!(values.get("system"), Some(&0.0));
    }

    #[test]
    fn test_known_values_skip_fallbacks() {
        let extractor = silent();
        let result = extractor.extract("User 0%", &cpu_patterns());
        let values = result.known_values();

        assert_eq!(values.get("user"), Some(&0.0));
        assert_eq!(values.get("system"), None);
    }

    #[test]
    fn test_derive_from_requires_inputs() {
        let extractor = silent();
        let mut partial = extractor.extract("User 30%", &cpu_patterns());
        let idle = partial.derive_from("idle", &["user", "system"], |e| {
            100.0 - e.value("user") - e.value("system")
        });
        assert_eq!(idle, None);
        assert_eq!(partial.status("idle"), None);

        let mut full = extractor.extract("User 30%, System 10%", &cpu_patterns());
        let idle = full.derive_from("idle", &["user", "system"], |e| {
            100.0 - e.value("user") - e.value("system")
        });
        assert_eq!(idle, Some(60.0));
        assert_eq!(full.status("idle"), Some(FieldStatus::Derived));
    }

    #[test]
    fn test_unknown_field_name() {
        let result = silent().extract("User 5%", &cpu_patterns());
        assert_eq!(result.value("nonexistent"), 0.0);
        assert_eq!(result.status("nonexistent"), None);
        assert!(!result.is_present("nonexistent"));
    }
}
