//! Data-source collaborators consumed by the collectors
//!
//! Sources only acquire raw data. Text sources hand back the captured output
//! for the extraction engine; platform sources hand back a typed key-value
//! snapshot in which a missing key means the platform did not report it.

use crate::error::CollectorError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Runs a host command
pub mod command;

/// Reads a file
pub mod file;

/// Battery and network interface state from sysfs
pub mod sysfs;

/// Volume capacity through statvfs(3)
pub mod statvfs;

/// Display connectors from the DRM subsystem
pub mod drm;

/// Process table from procfs
pub mod procfs;

/// Running services from systemctl
pub mod systemd;

pub use command::CommandSource;
pub use drm::DrmDisplaySource;
pub use file::FileSource;
pub use procfs::ProcfsProcessSource;
pub use statvfs::StatvfsStorageSource;
pub use sysfs::{SysfsBatterySource, SysfsNetworkSource};
pub use systemd::SystemctlServiceSource;

/// Source of a text blob, such as command output or a kernel info file
#[cfg_attr(test, mockall::automock)]
pub trait RawTextSource: Send {
    /// Capture the full text
    ///
    /// # Errors
    ///
    /// Returns `CollectorError` when the source is unavailable or access is denied.
    fn run(&self) -> Result<String, CollectorError>;

    /// Short description for logs, e.g. the command line
    fn describe(&self) -> String;
}

/// Source of a typed key-value snapshot
#[cfg_attr(test, mockall::automock)]
pub trait PlatformFieldSource: Send {
    fn read(&self) -> Result<FieldMap, CollectorError>;
}

/// Source of a list of typed key-value records, e.g. one per process
#[cfg_attr(test, mockall::automock)]
pub trait PlatformListSource: Send {
    fn list(&self) -> Result<Vec<FieldMap>, CollectorError>;
}

/// A typed platform value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// Key-value snapshot from a platform source
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldMap {
    values: BTreeMap<String, FieldValue>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value; chainable
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Int(i) => Some(*i != 0),
            FieldValue::Text(t) => match t.trim() {
                "1" | "true" | "yes" => Some(true),
                "0" | "false" | "no" => Some(false),
                _ => None,
            },
            FieldValue::Float(_) => None,
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Float(f) if f.is_finite() => Some(*f as i64),
            FieldValue::Text(t) => t.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.values.get(key)? {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Text(t) => t.trim().parse().ok(),
            FieldValue::Bool(_) => None,
        }
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            FieldValue::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }
}
