use super::{add_extra_patterns, extract_text, Collector};
use crate::diagnostics::Diagnostics;
use crate::error::CollectorError;
use crate::extract::{Coercion, Extraction, FieldPattern, MetricExtractor};
use crate::history::HistoryCache;
use crate::samples::{Sample, Timestamp};
use crate::sources::RawTextSource;
use crate::summary::{Summary, SummaryValue};
use crate::units::BYTES_PER_KB;
use chrono::Utc;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Field name, meminfo key and summary label
const FIELDS: [(&str, &str, &str); 7] = [
    ("total", "MemTotal", "Total Memory"),
    ("free", "MemFree", "Free Memory"),
    ("available", "MemAvailable", "Available Memory"),
    ("active", "Active", "Active Memory"),
    ("inactive", "Inactive", "Inactive Memory"),
    ("cached", "Cached", "Cached Memory"),
    ("kernel_stack", "KernelStack", "Kernel Stack"),
];

fn builtin_patterns() -> Result<Vec<FieldPattern>, CollectorError> {
    FIELDS
        .iter()
        .map(|(name, key, _)| -> Result<FieldPattern, CollectorError> {
            // Anchored so `Active:` does not match `Active(anon):`
            let alternative = format!(r"(?m)^{}:\s+\d+", key);
            Ok(FieldPattern::new(*name, &[alternative.as_str()])?.with_coercion(Coercion::Integer))
        })
        .collect()
}

/// Memory counters from one poll, in kB
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryUsage {
    polled_at: Timestamp,
    extraction: Extraction,
}

impl MemoryUsage {
    pub fn polled_at(&self) -> Timestamp {
        self.polled_at
    }

    /// Counter in kB, 0 when absent from the input
    pub fn kib(&self, field: &str) -> f64 {
        self.extraction.value(field)
    }

    pub fn total(&self) -> f64 {
        self.kib("total")
    }

    pub fn free(&self) -> f64 {
        self.kib("free")
    }

    /// `total - free`, 0 unless both were read
    pub fn used(&self) -> f64 {
        self.kib("used")
    }

    pub fn kernel_stack(&self) -> f64 {
        self.kib("kernel_stack")
    }

    pub fn extraction(&self) -> &Extraction {
        &self.extraction
    }

    /// Counter in bytes when it was read from the input
    fn known_bytes(&self, field: &str) -> Option<i64> {
        self.extraction
            .get(field)
            .and_then(|f| f.known())
            .map(|kib| (kib * BYTES_PER_KB) as i64)
    }
}

/// Memory collector over `/proc/meminfo`-style text
pub struct MemoryCollector {
    source: Box<dyn RawTextSource>,
    extractor: MetricExtractor,
    patterns: Vec<FieldPattern>,
    state: Option<MemoryUsage>,
    history: HistoryCache<Sample>,
}

impl MemoryCollector {
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

    pub fn add_patterns(
        &mut self,
        extra: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), CollectorError> {
        add_extra_patterns("memory", &mut self.patterns, extra)
    }

    pub fn usage(&self) -> Option<&MemoryUsage> {
        self.state.as_ref()
    }

    pub fn history_mut(&mut self) -> &mut HistoryCache<Sample> {
        &mut self.history
    }
}

impl Collector for MemoryCollector {
    fn name(&self) -> &str {
        "memory"
    }

    fn poll(&mut self) -> Result<(), CollectorError> {
        debug!("Polling memory via {}", self.source.describe());
        let mut extraction = extract_text(self.source.as_ref(), &self.extractor, &self.patterns)?;
        extraction.derive_from("used", &["total", "free"], |e| {
            e.value("total") - e.value("free")
        });

        let usage = MemoryUsage {
            polled_at: Utc::now(),
            extraction,
        };
        self.history
            .push(Sample::from_extraction(usage.polled_at, &usage.extraction));
        self.state = Some(usage);
        Ok(())
    }

    fn summary(&self) -> Summary {
        let mut summary =
            Summary::new("Memory Information", self.state.as_ref().map(|s| s.polled_at));

        let labels = FIELDS
            .iter()
            .map(|(name, _, label)| (*name, *label))
            .chain(std::iter::once(("used", "Used Memory")));
        for (name, label) in labels {
            let value = self
                .state
                .as_ref()
                .and_then(|usage| usage.known_bytes(name));
            summary.push(label, SummaryValue::bytes_or_unknown(value));
        }
        summary
    }

    fn history(&self) -> Option<&HistoryCache<Sample>> {
        Some(&self.history)
    }
}
