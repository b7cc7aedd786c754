//! Wi-Fi and mobile network collector
//!
//! Signal level and channel frequency are not part of a poll. They arrive
//! later as Wi-Fi scan results delivered through a `ScanInbox`, and the
//! summary reports the entry whose SSID matches the connected one.

use super::Collector;
use crate::error::CollectorError;
use crate::samples::Timestamp;
use crate::sources::{FieldMap, PlatformFieldSource};
use crate::summary::{Summary, SummaryValue};
use chrono::Utc;
use log::{debug, info};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

/// One access point from a Wi-Fi scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessPoint {
    pub ssid: String,
    /// Signal level in dBm
    pub level: i32,
    /// Channel frequency in MHz
    pub frequency: u32,
}

/// Cloneable handle for delivering scan results from another thread
#[derive(Debug, Clone, Default)]
pub struct ScanInbox {
    latest: Arc<Mutex<Option<Vec<AccessPoint>>>>,
}

impl ScanInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored scan with `results`
    pub fn deliver(&self, results: Vec<AccessPoint>) {
        debug!("Received {} Wi-Fi scan results", results.len());
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(results);
    }

    /// Last matching entry for `ssid` in the most recent scan
    pub fn lookup(&self, ssid: &str) -> Option<AccessPoint> {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        latest
            .as_ref()?
            .iter()
            .rev()
            .find(|ap| ap.ssid == ssid)
            .cloned()
    }

    pub fn has_results(&self) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Cellular generation classified from the radio subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MobileGeneration {
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
}

impl MobileGeneration {
    /// Classify a connected mobile network
    ///
    /// Known 2G and 4G-or-newer subtypes map directly; anything else,
    /// including a missing subtype, counts as 3G.
    pub fn classify(subtype: Option<&str>, wimax: bool) -> Self {
        if wimax {
            return MobileGeneration::FourG;
        }
        match subtype.map(str::to_ascii_uppercase).as_deref() {
            Some("GPRS" | "EDGE" | "CDMA" | "1XRTT" | "IDEN" | "GSM") => MobileGeneration::TwoG,
            Some("LTE" | "LTE_CA" | "IWLAN" | "NR") => MobileGeneration::FourG,
            _ => MobileGeneration::ThreeG,
        }
    }
}

/// Split a numeric operator string such as `310260` into MCC and MNC
///
/// The first three digits are the MCC and the remainder the MNC. Anything
/// unparseable yields `(0, 0)`.
pub fn parse_mcc_mnc(operator: &str) -> (u32, u32) {
    let operator = operator.trim();
    if operator.len() <= 3 || !operator.is_ascii() {
        return (0, 0);
    }
    let (mcc, mnc) = operator.split_at(3);
    match (mcc.parse(), mnc.parse()) {
        (Ok(mcc), Ok(mnc)) => (mcc, mnc),
        _ => (0, 0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WifiInfo {
    pub connected: bool,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub ssid: Option<String>,
    /// Mbps
    pub link_speed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MobileInfo {
    /// `None` when no mobile network is connected
    pub generation: Option<MobileGeneration>,
    pub carrier: Option<String>,
    pub mcc: u32,
    pub mnc: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkState {
    pub polled_at: Timestamp,
    pub wifi: WifiInfo,
    pub mobile: MobileInfo,
}

impl NetworkState {
    fn from_fields(fields: &FieldMap) -> Self {
        let text = |key: &str| fields.get_text(key).map(str::to_string);
        let wifi_connected = fields.get_bool("wifi_connected").unwrap_or(false);
        let wifi = WifiInfo {
            connected: wifi_connected,
            ip_address: text("wifi_ip"),
            mac_address: text("wifi_mac"),
            ssid: text("wifi_ssid").map(|s| s.trim_matches('"').to_string()),
            link_speed: fields.get_i64("wifi_link_speed"),
        };

        let wimax = fields.get_bool("wimax_connected").unwrap_or(false);
        let mobile_connected = fields.get_bool("mobile_connected").unwrap_or(false) || wimax;
        let mobile = if mobile_connected {
            let (mcc, mnc) = fields
                .get_text("operator")
                .map(parse_mcc_mnc)
                .unwrap_or((0, 0));
            MobileInfo {
                generation: Some(MobileGeneration::classify(
                    fields.get_text("mobile_subtype"),
                    wimax,
                )),
                carrier: text("carrier"),
                mcc,
                mnc,
            }
        } else {
            MobileInfo {
                generation: None,
                carrier: None,
                mcc: 0,
                mnc: 0,
            }
        };

        Self {
            polled_at: Utc::now(),
            wifi,
            mobile,
        }
    }
}

/// Network collector over a platform field source
pub struct NetworkCollector {
    source: Box<dyn PlatformFieldSource>,
    state: Option<NetworkState>,
    scans: ScanInbox,
}

impl NetworkCollector {
    pub fn new(source: Box<dyn PlatformFieldSource>) -> Self {
        Self {
            source,
            state: None,
            scans: ScanInbox::new(),
        }
    }

    /// Handle for delivering scan results, usable from any thread
    pub fn scan_inbox(&self) -> ScanInbox {
        self.scans.clone()
    }

    pub fn state(&self) -> Option<&NetworkState> {
        self.state.as_ref()
    }

    /// Scan entry for the connected SSID, if any scan has reported it
    pub fn connected_access_point(&self) -> Option<AccessPoint> {
        let state = self.state.as_ref()?;
        if !state.wifi.connected {
            return None;
        }
        self.scans.lookup(state.wifi.ssid.as_deref()?)
    }

    pub fn signal_level(&self) -> Option<i32> {
        self.connected_access_point().map(|ap| ap.level)
    }

    pub fn frequency(&self) -> Option<u32> {
        self.connected_access_point().map(|ap| ap.frequency)
    }
}

impl Collector for NetworkCollector {
    fn name(&self) -> &str {
        "network"
    }

    fn poll(&mut self) -> Result<(), CollectorError> {
        let fields = self.source.read()?;
        if !fields.contains("wifi_connected") && !fields.contains("mobile_connected") {
            return Err(CollectorError::Unrecognized("network".to_string()));
        }

        let state = NetworkState::from_fields(&fields);
        if state.wifi.connected && !self.scans.has_results() {
            info!("Wi-Fi connected; signal level pending a scan delivery");
        }
        self.state = Some(state);
        Ok(())
    }

    fn summary(&self) -> Summary {
        let mut summary =
            Summary::new("Network Information", self.state.as_ref().map(|s| s.polled_at));
        let Some(state) = &self.state else {
            return summary
                .entry("Wi-Fi Connected", SummaryValue::Unknown)
                .entry("Mobile Network", SummaryValue::Unknown);
        };

        let wifi = &state.wifi;
        summary.push("Wi-Fi Connected", SummaryValue::Flag(wifi.connected));
        if wifi.connected {
            let access_point = self.connected_access_point();
            summary.push(
                "IP Address",
                SummaryValue::text_or_unknown(wifi.ip_address.as_deref()),
            );
            summary.push(
                "MAC Address",
                SummaryValue::text_or_unknown(wifi.mac_address.as_deref()),
            );
            summary.push(
                "Access Point SSID",
                SummaryValue::text_or_unknown(wifi.ssid.as_deref()),
            );
            summary.push(
                "Link Speed",
                SummaryValue::text_or_unknown(
                    wifi.link_speed.map(|s| format!("{} Mbps", s)).as_deref(),
                ),
            );
            summary.push(
                "Signal Level",
                SummaryValue::text_or_unknown(
                    access_point.as_ref().map(|ap| format!("{} dBm", ap.level)).as_deref(),
                ),
            );
            summary.push(
                "Frequency",
                SummaryValue::text_or_unknown(
                    access_point
                        .as_ref()
                        .map(|ap| format!("{} MHz", ap.frequency))
                        .as_deref(),
                ),
            );
        }

        let generation = state.mobile.generation;
        summary.push(
            "2G Cellular",
            SummaryValue::Flag(generation == Some(MobileGeneration::TwoG)),
        );
        summary.push(
            "3G Cellular",
            SummaryValue::Flag(generation == Some(MobileGeneration::ThreeG)),
        );
        summary.push(
            "4G Cellular",
            SummaryValue::Flag(generation == Some(MobileGeneration::FourG)),
        );
        if generation.is_some() {
            summary.push(
                "Carrier Name",
                SummaryValue::text_or_unknown(state.mobile.carrier.as_deref()),
            );
            summary.push(
                "Mobile Country Code (MCC)",
                SummaryValue::Number(f64::from(state.mobile.mcc)),
            );
            summary.push(
                "Mobile Network Code (MNC)",
                SummaryValue::Number(f64::from(state.mobile.mnc)),
            );
        }
        summary
    }
}
