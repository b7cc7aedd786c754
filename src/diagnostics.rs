//! Injected logging collaborator for parsing code
//!
//! The extraction engine and the collectors report through a `Diagnostics`
//! handle instead of calling the `log` macros directly, so their output can be
//! routed, tagged or silenced per collector and captured in tests.

use log::{debug, error, info};

/// Sink for diagnostic messages emitted while polling and parsing
#[cfg_attr(test, mockall::automock)]
pub trait Diagnostics: Send + Sync {
    /// Verbose detail, e.g. which pattern matched
    fn debug(&self, message: &str);

    /// Notable but expected conditions
    fn info(&self, message: &str);

    /// Recovered failures such as an uncoercible field
    fn error(&self, message: &str);
}

/// Forwards diagnostics to the `log` facade under a fixed target tag
#[derive(Debug, Clone)]
pub struct LogDiagnostics {
    tag: String,
}

impl LogDiagnostics {
    /// Create a forwarder that logs with `tag` as the record target
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl Default for LogDiagnostics {
    fn default() -> Self {
        Self::new("devprobe")
    }
}

impl Diagnostics for LogDiagnostics {
    fn debug(&self, message: &str) {
        debug!(target: self.tag.as_str(), "{}", message);
    }

    fn info(&self, message: &str) {
        info!(target: self.tag.as_str(), "{}", message);
    }

    fn error(&self, message: &str) {
        error!(target: self.tag.as_str(), "{}", message);
    }
}

/// Discards every message
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentDiagnostics;

impl Diagnostics for SilentDiagnostics {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Captures messages in memory for assertions
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingDiagnostics {
    entries: std::sync::Mutex<Vec<(log::Level, String)>>,
}

#[cfg(test)]
impl RecordingDiagnostics {
    pub(crate) fn entries(&self) -> Vec<(log::Level, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, level: log::Level) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }

    fn push(&self, level: log::Level, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

#[cfg(test)]
impl Diagnostics for RecordingDiagnostics {
    fn debug(&self, message: &str) {
        self.push(log::Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.push(log::Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.push(log::Level::Error, message);
    }
}
