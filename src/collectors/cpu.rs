use super::{add_extra_patterns, extract_text, Collector};
use crate::diagnostics::Diagnostics;
use crate::error::CollectorError;
use crate::extract::{Extraction, FieldPattern, MetricExtractor};
use crate::history::HistoryCache;
use crate::samples::{Sample, Timestamp};
use crate::sources::RawTextSource;
use crate::summary::{Summary, SummaryValue};
use chrono::Utc;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Percentage with up to two decimals, e.g. `12` or `12.34`
const PCT: &str = r"\d{1,3}(?:\.\d{1,2})?";

/// Built-in alternatives per field, tried in this order:
/// `User 12%,` (legacy Android), `12.3% user` / `12%user` (toybox, busybox)
/// and procps `1.2 us`
///
/// A leading label only counts when its percentage ends the field, so in
/// `12%user 0%nice` the `user` label never claims the `0%` that follows it.
fn builtin_patterns() -> Result<Vec<FieldPattern>, CollectorError> {
    let user = [
        format!(r"(?im)\buse?r\s+{PCT}%(?:,|\s*$)"),
        format!(r"(?i)\b{PCT}%\s*use?r\b"),
        format!(r"\b{PCT}\s+us\b"),
    ];
    let system = [
        format!(r"(?im)\bsys(?:tem)?\s+{PCT}%(?:,|\s*$)"),
        format!(r"(?i)\b{PCT}%\s*sys(?:tem)?\b"),
        format!(r"\b{PCT}\s+sy\b"),
    ];

    Ok(vec![
        FieldPattern::new("user", &user.iter().map(String::as_str).collect::<Vec<_>>())?,
        FieldPattern::new("system", &system.iter().map(String::as_str).collect::<Vec<_>>())?,
    ])
}

/// CPU utilisation from one poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuUsage {
    polled_at: Timestamp,
    extraction: Extraction,
}

impl CpuUsage {
    pub fn polled_at(&self) -> Timestamp {
        self.polled_at
    }

    /// User percentage, 0 when the output did not carry it
    pub fn user(&self) -> f64 {
        self.extraction.value("user")
    }

    pub fn system(&self) -> f64 {
        self.extraction.value("system")
    }

    /// `100 - user - system`, not clamped; `None` unless both were read
    pub fn idle(&self) -> Option<f64> {
        self.extraction.get("idle").and_then(|f| f.known())
    }

    pub fn extraction(&self) -> &Extraction {
        &self.extraction
    }
}

/// CPU collector over `top`-style output
///
/// Each successful poll appends a `user`/`system`/`idle` sample to the
/// history.
pub struct CpuCollector {
    source: Box<dyn RawTextSource>,
    extractor: MetricExtractor,
    patterns: Vec<FieldPattern>,
    state: Option<CpuUsage>,
    history: HistoryCache<Sample>,
}

impl CpuCollector {
    /// # Errors
    ///
    /// Returns `CollectorError::InvalidPattern` if a built-in pattern fails to compile.
    pub fn new(
        source: Box<dyn RawTextSource>,
        diagnostics: Arc<dyn Diagnostics>,
        max_entries: usize,
    ) -> Result<Self, CollectorError> {
        Ok(Self {
            source,
            extractor: MetricExtractor::new(diagnostics),
            patterns: builtin_patterns()?,
            state: None,
            history: HistoryCache::new(max_entries),
        })
    }

    /// Add alternatives keyed by field name (`user`, `system`)
    pub fn add_patterns(
        &mut self,
        extra: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), CollectorError> {
        add_extra_patterns("cpu", &mut self.patterns, extra)
    }

    pub fn usage(&self) -> Option<&CpuUsage> {
        self.state.as_ref()
    }

    pub fn user(&self) -> Option<f64> {
        self.state.as_ref().map(CpuUsage::user)
    }

    pub fn system(&self) -> Option<f64> {
        self.state.as_ref().map(CpuUsage::system)
    }

    pub fn idle(&self) -> Option<f64> {
        self.state.as_ref().and_then(CpuUsage::idle)
    }

    pub fn history_mut(&mut self) -> &mut HistoryCache<Sample> {
        &mut self.history
    }
}

impl Collector for CpuCollector {
    fn name(&self) -> &str {
        "cpu"
    }

    fn poll(&mut self) -> Result<(), CollectorError> {
        debug!("Polling cpu via {}", self.source.describe());
        let mut extraction = extract_text(self.source.as_ref(), &self.extractor, &self.patterns)?;
        extraction.derive_from("idle", &["user", "system"], |e| {
            100.0 - e.value("user") - e.value("system")
        });

        let usage = CpuUsage {
            polled_at: Utc::now(),
            extraction,
        };
        self.history
            .push(Sample::from_extraction(usage.polled_at, &usage.extraction));
        self.state = Some(usage);
        Ok(())
    }

    fn summary(&self) -> Summary {
        let summary = Summary::new("CPU Information", self.state.as_ref().map(|s| s.polled_at));
        let Some(usage) = &self.state else {
            return summary
                .entry("User CPU", SummaryValue::Unknown)
                .entry("System CPU", SummaryValue::Unknown)
                .entry("Idle CPU", SummaryValue::Unknown);
        };

        let known = |field: &str| usage.extraction.get(field).and_then(|f| f.known());
        summary
            .entry("User CPU", SummaryValue::percent_or_unknown(known("user")))
            .entry("System CPU", SummaryValue::percent_or_unknown(known("system")))
            .entry("Idle CPU", SummaryValue::percent_or_unknown(usage.idle()))
    }

    fn history(&self) -> Option<&HistoryCache<Sample>> {
        Some(&self.history)
    }
}
