use super::Collector;
use crate::error::CollectorError;
use crate::samples::Timestamp;
use crate::sources::{FieldMap, PlatformFieldSource};
use crate::summary::{Summary, SummaryValue};
use chrono::Utc;
use log::debug;
use serde::Serialize;

/// What the device is drawing power from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlugType {
    Ac,
    Usb,
    Wireless,
    Unplugged,
}

impl PlugType {
    fn from_source(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("ac") | Some("mains") => PlugType::Ac,
            Some("usb") => PlugType::Usb,
            Some("wireless") => PlugType::Wireless,
            _ => PlugType::Unplugged,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlugType::Ac => "AC",
            PlugType::Usb => "USB",
            PlugType::Wireless => "Wireless",
            PlugType::Unplugged => "None",
        }
    }
}

/// Battery snapshot from one poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryState {
    pub polled_at: Timestamp,
    /// Raw status string, e.g. `Charging`
    pub status: Option<String>,
    /// Status is charging or full
    pub charging: bool,
    pub plug: PlugType,
    pub level: Option<i64>,
    pub scale: Option<i64>,
    pub health: Option<String>,
    pub technology: Option<String>,
}

impl BatteryState {
    fn from_fields(fields: &FieldMap) -> Self {
        let status = fields.get_text("status").map(str::to_string);
        let charging = status
            .as_deref()
            .map(|s| matches!(s.to_ascii_lowercase().as_str(), "charging" | "full"))
            .unwrap_or(false);

        Self {
            polled_at: Utc::now(),
            status,
            charging,
            plug: PlugType::from_source(fields.get_text("plugged")),
            level: fields.get_i64("level"),
            scale: fields.get_i64("scale"),
            health: fields.get_text("health").map(str::to_string),
            technology: fields.get_text("technology").map(str::to_string),
        }
    }

    /// `level / scale * 100`, unknown without a level or a positive scale
    pub fn percent(&self) -> Option<f64> {
        match (self.level, self.scale) {
            (Some(level), Some(scale)) if scale > 0 => Some(level as f64 / scale as f64 * 100.0),
            _ => None,
        }
    }
}

/// Battery collector over a platform field source
pub struct BatteryCollector {
    source: Box<dyn PlatformFieldSource>,
    state: Option<BatteryState>,
}

impl BatteryCollector {
    pub fn new(source: Box<dyn PlatformFieldSource>) -> Self {
        Self {
            source,
            state: None,
        }
    }

    pub fn state(&self) -> Option<&BatteryState> {
        self.state.as_ref()
    }

    pub fn is_charging(&self) -> Option<bool> {
        self.state.as_ref().map(|s| s.charging)
    }

    pub fn percent(&self) -> Option<f64> {
        self.state.as_ref().and_then(BatteryState::percent)
    }
}

impl Collector for BatteryCollector {
    fn name(&self) -> &str {
        "battery"
    }

    fn poll(&mut self) -> Result<(), CollectorError> {
        let fields = self.source.read()?;
        if !fields.contains("status") && !fields.contains("level") {
            return Err(CollectorError::Unrecognized("battery".to_string()));
        }

        let state = BatteryState::from_fields(&fields);
        debug!(
            "Battery: status={:?} plug={:?} level={:?}",
            state.status, state.plug, state.level
        );
        self.state = Some(state);
        Ok(())
    }

    fn summary(&self) -> Summary {
        let summary = Summary::new("Battery Information", self.state.as_ref().map(|s| s.polled_at));
        let Some(state) = &self.state else {
            return summary
                .entry("Is Charging", SummaryValue::Unknown)
                .entry("Plug Type", SummaryValue::Unknown)
                .entry("Battery Level", SummaryValue::Unknown);
        };

        let mut summary = summary
            .entry("Is Charging", SummaryValue::Flag(state.charging))
            .entry("Plug Type", SummaryValue::Text(state.plug.label().to_string()))
            .entry("Battery Level", SummaryValue::percent_or_unknown(state.percent()))
            .entry("Status", SummaryValue::text_or_unknown(state.status.as_deref()));
        if let Some(health) = &state.health {
            summary.push("Health", SummaryValue::Text(health.clone()));
        }
        if let Some(technology) = &state.technology {
            summary.push("Technology", SummaryValue::Text(technology.clone()));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockPlatformFieldSource;

    fn collector(reads: Vec<Result<FieldMap, CollectorError>>) -> BatteryCollector {
        let mut source = MockPlatformFieldSource::new();
        let mut reads = reads.into_iter();
        source
            .expect_read()
            .returning(move || reads.next().unwrap_or_else(|| Ok(FieldMap::new())));
        BatteryCollector::new(Box::new(source))
    }

    #[test]
    fn test_charging_on_usb() {
        let fields = FieldMap::new()
            .with("status", "Charging")
            .with("plugged", "usb")
            .with("level", 45i64)
            .with("scale", 50i64);
        let mut battery = collector(vec![Ok(fields)]);
        battery.poll().unwrap();

        assert_eq!(battery.is_charging(), Some(true));
        assert_eq!(battery.percent(), Some(90.0));
        let summary = battery.summary();
        assert_eq!(summary.get("Plug Type"), Some(&SummaryValue::Text("USB".to_string())));
        assert_eq!(summary.get("Battery Level"), Some(&SummaryValue::Percent(90.0)));
    }

    #[test]
    fn test_full_counts_as_charging() {
        let fields = FieldMap::new().with("status", "Full").with("plugged", "ac");
        let mut battery = collector(vec![Ok(fields)]);
        battery.poll().unwrap();

        let state = battery.state().unwrap();
        assert!(state.charging);
        assert_eq!(state.plug, PlugType::Ac);
        assert_eq!(state.percent(), None);
    }

    #[test]
    fn test_discharging_unplugged() {
        let fields = FieldMap::new()
            .with("status", "Discharging")
            .with("level", 30i64)
            .with("scale", 100i64);
        let mut battery = collector(vec![Ok(fields)]);
        battery.poll().unwrap();

        assert_eq!(battery.is_charging(), Some(false));
        assert_eq!(battery.state().unwrap().plug, PlugType::Unplugged);
        assert_eq!(battery.percent(), Some(30.0));
    }

    #[test]
    fn test_zero_scale_is_unknown_percent() {
        let fields = FieldMap::new().with("level", 30i64).with("scale", 0i64);
        let mut battery = collector(vec![Ok(fields)]);
        battery.poll().unwrap();

        assert_eq!(battery.percent(), None);
        assert!(battery.summary().get("Battery Level").unwrap().is_unknown());
    }

    #[test]
    fn test_summary_before_first_poll() {
        let battery = collector(vec![]);
        let summary = battery.summary();
        assert!(summary.polled_at.is_none());
        assert!(summary.entries.iter().all(|e| e.value.is_unknown()));
        assert_eq!(battery.is_charging(), None);
    }

    #[test]
    fn test_failed_poll_keeps_state() {
        let fields = FieldMap::new().with("status", "Charging").with("plugged", "ac");
        let mut battery = collector(vec![
            Ok(fields),
            Err(CollectorError::AccessDenied("power_supply".to_string())),
            Ok(FieldMap::new()),
        ]);
        battery.poll().unwrap();
        let before = battery.summary();

        assert!(matches!(battery.poll(), Err(CollectorError::AccessDenied(_))));
        assert!(matches!(battery.poll(), Err(CollectorError::Unrecognized(_))));
        assert_eq!(battery.summary(), before);
        assert!(battery.history().is_none());
    }
}
