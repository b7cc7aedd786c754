use super::Collector;
use crate::error::CollectorError;
use crate::samples::Timestamp;
use crate::sources::{FieldMap, PlatformListSource};
use crate::summary::{Summary, SummaryValue};
use chrono::Utc;
use serde::Serialize;

/// One service unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceInfo {
    pub unit: String,
    pub active: Option<String>,
    pub sub: Option<String>,
    pub description: Option<String>,
}

impl ServiceInfo {
    fn from_fields(fields: &FieldMap) -> Option<Self> {
        Some(Self {
            unit: fields.get_text("unit")?.to_string(),
            active: fields.get_text("active").map(str::to_string),
            sub: fields.get_text("sub").map(str::to_string),
            description: fields.get_text("description").map(str::to_string),
        })
    }

    fn status(&self) -> String {
        match (&self.active, &self.sub) {
            (Some(active), Some(sub)) => format!("{} ({})", active, sub),
            (Some(active), None) => active.clone(),
            (None, Some(sub)) => sub.clone(),
            (None, None) => "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceList {
    pub polled_at: Timestamp,
    pub services: Vec<ServiceInfo>,
}

/// Service collector over a platform list source
///
/// An empty listing is valid: no services are running.
pub struct ServiceCollector {
    source: Box<dyn PlatformListSource>,
    state: Option<ServiceList>,
}

impl ServiceCollector {
    pub fn new(source: Box<dyn PlatformListSource>) -> Self {
        Self {
            source,
            state: None,
        }
    }

    pub fn services(&self) -> &[ServiceInfo] {
        self.state
            .as_ref()
            .map(|s| s.services.as_slice())
            .unwrap_or(&[])
    }
}

impl Collector for ServiceCollector {
    fn name(&self) -> &str {
        "services"
    }

    fn poll(&mut self) -> Result<(), CollectorError> {
        let records = self.source.list()?;
        let services = records.iter().filter_map(ServiceInfo::from_fields).collect();

        self.state = Some(ServiceList {
            polled_at: Utc::now(),
            services,
        });
        Ok(())
    }

    fn summary(&self) -> Summary {
        let mut summary =
            Summary::new("Running Services", self.state.as_ref().map(|s| s.polled_at));
        let Some(list) = &self.state else {
            return summary.entry("Service Count", SummaryValue::Unknown);
        };

        summary.push("Service Count", SummaryValue::Number(list.services.len() as f64));
        for service in &list.services {
            summary.push(service.unit.clone(), SummaryValue::Text(service.status()));
        }
        summary
    }
}
