use super::Collector;
use crate::error::CollectorError;
use crate::samples::Timestamp;
use crate::sources::{FieldMap, PlatformFieldSource};
use crate::summary::{Summary, SummaryValue};
use chrono::Utc;
use serde::Serialize;

/// Mount state of the external volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalState {
    Mounted,
    MountedReadOnly,
    Absent,
}

impl ExternalState {
    fn from_source(value: Option<&str>) -> Self {
        match value {
            Some("mounted") => ExternalState::Mounted,
            Some("mounted_ro") => ExternalState::MountedReadOnly,
            _ => ExternalState::Absent,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExternalState::Mounted => "mounted",
            ExternalState::MountedReadOnly => "mounted read-only",
            ExternalState::Absent => "absent",
        }
    }
}

/// Capacity of one volume
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeInfo {
    pub path: Option<String>,
    pub total_bytes: Option<i64>,
    pub available_bytes: Option<i64>,
}

impl VolumeInfo {
    fn from_fields(fields: &FieldMap, prefix: &str) -> Self {
        Self {
            path: fields
                .get_text(&format!("{}_path", prefix))
                .map(str::to_string),
            total_bytes: fields.get_i64(&format!("{}_total", prefix)),
            available_bytes: fields.get_i64(&format!("{}_available", prefix)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageState {
    pub polled_at: Timestamp,
    pub internal: VolumeInfo,
    pub external_state: ExternalState,
    /// `None` unless the external volume is mounted
    pub external: Option<VolumeInfo>,
}

impl StorageState {
    /// Only a read-write mount is writeable
    pub fn external_writeable(&self) -> bool {
        self.external_state == ExternalState::Mounted
    }
}

/// Storage collector over a platform field source
pub struct StorageCollector {
    source: Box<dyn PlatformFieldSource>,
    state: Option<StorageState>,
}

impl StorageCollector {
    pub fn new(source: Box<dyn PlatformFieldSource>) -> Self {
        Self {
            source,
            state: None,
        }
    }

    pub fn state(&self) -> Option<&StorageState> {
        self.state.as_ref()
    }
}

impl Collector for StorageCollector {
    fn name(&self) -> &str {
        "storage"
    }

    fn poll(&mut self) -> Result<(), CollectorError> {
        let fields = self.source.read()?;
        if !fields.contains("internal_total") {
            return Err(CollectorError::Unrecognized("storage".to_string()));
        }

        let external_state = ExternalState::from_source(fields.get_text("external_state"));
        let external = (external_state != ExternalState::Absent)
            .then(|| VolumeInfo::from_fields(&fields, "external"));

        self.state = Some(StorageState {
            polled_at: Utc::now(),
            internal: VolumeInfo::from_fields(&fields, "internal"),
            external_state,
            external,
        });
        Ok(())
    }

    fn summary(&self) -> Summary {
        let mut summary =
            Summary::new("Storage Information", self.state.as_ref().map(|s| s.polled_at));
        let Some(state) = &self.state else {
            return summary
                .entry("Internal Total", SummaryValue::Unknown)
                .entry("Internal Available", SummaryValue::Unknown)
                .entry("External Storage", SummaryValue::Unknown);
        };

        summary.push(
            "Internal Location",
            SummaryValue::text_or_unknown(state.internal.path.as_deref()),
        );
        summary.push(
            "Internal Total",
            SummaryValue::bytes_or_unknown(state.internal.total_bytes),
        );
        summary.push(
            "Internal Available",
            SummaryValue::bytes_or_unknown(state.internal.available_bytes),
        );
        summary.push(
            "External Storage",
            SummaryValue::Text(state.external_state.label().to_string()),
        );
        summary.push(
            "External Writeable",
            SummaryValue::Flag(state.external_writeable()),
        );
        if let Some(external) = &state.external {
            summary.push(
                "External Location",
                SummaryValue::text_or_unknown(external.path.as_deref()),
            );
            summary.push(
                "External Total",
                SummaryValue::bytes_or_unknown(external.total_bytes),
            );
            summary.push(
                "External Available",
                SummaryValue::bytes_or_unknown(external.available_bytes),
            );
        }
        summary
    }
}
