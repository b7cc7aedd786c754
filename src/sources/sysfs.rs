//! Battery and network interface state read from `/sys/class`
//!
//! Each attribute is a small text file. Unreadable attributes are left out
//! of the returned `FieldMap` rather than failing the whole read.

use super::{FieldMap, PlatformFieldSource};
use crate::error::CollectorError;
use log::{debug, warn};
use std::ffi::CStr;
use std::fs;
use std::io::ErrorKind;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Read a sysfs attribute, trimmed
pub(super) fn read_attr(dir: &Path, name: &str) -> Option<String> {
    fs::read_to_string(dir.join(name))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Sorted subdirectories of `dir`
pub(super) fn list_dirs(dir: &Path, source_name: &str) -> Result<Vec<PathBuf>, CollectorError> {
    let entries = fs::read_dir(dir).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => {
            CollectorError::AccessDenied(format!("{}: {}", dir.display(), e))
        }
        _ => CollectorError::acquisition(source_name, format!("{}: {}", dir.display(), e)),
    })?;

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Battery state from `/sys/class/power_supply`
///
/// Reports `status`, `level`, `scale`, `plugged` (`ac`, `usb`, `wireless` or
/// `none`) and, when available, `present`, `health`, `technology` and
/// `voltage_uv`.
#[derive(Debug, Clone)]
pub struct SysfsBatterySource {
    power_supply_dir: PathBuf,
}

impl SysfsBatterySource {
    pub const DEFAULT_DIR: &'static str = "/sys/class/power_supply";

    pub fn new(power_supply_dir: impl Into<PathBuf>) -> Self {
        Self {
            power_supply_dir: power_supply_dir.into(),
        }
    }

    /// Plug type from the first online external supply
    fn plugged(supplies: &[PathBuf]) -> &'static str {
        for supply in supplies {
            let online = read_attr(supply, "online").is_some_and(|v| v == "1");
            if !online {
                continue;
            }
            match read_attr(supply, "type").as_deref() {
                Some("Mains") => return "ac",
                Some(t) if t.starts_with("USB") => return "usb",
                Some("Wireless") => return "wireless",
                _ => {}
            }
        }
        "none"
    }
}

impl Default for SysfsBatterySource {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIR)
    }
}

impl PlatformFieldSource for SysfsBatterySource {
    fn read(&self) -> Result<FieldMap, CollectorError> {
        let supplies = list_dirs(&self.power_supply_dir, "power_supply")?;
        let battery = supplies
            .iter()
            .find(|dir| read_attr(dir, "type").as_deref() == Some("Battery"))
            .ok_or_else(|| {
                CollectorError::acquisition(
                    "power_supply",
                    format!("no battery under {}", self.power_supply_dir.display()),
                )
            })?;
        debug!("Reading battery state from {}", battery.display());

        let mut fields = FieldMap::new();
        if let Some(status) = read_attr(battery, "status") {
            fields.insert("status", status);
        }
        if let Some(level) = read_attr(battery, "capacity").and_then(|v| v.parse::<i64>().ok()) {
            fields.insert("level", level);
            fields.insert("scale", 100i64);
        }
        if let Some(present) = read_attr(battery, "present") {
            fields.insert("present", present == "1");
        }
        if let Some(health) = read_attr(battery, "health") {
            fields.insert("health", health);
        }
        if let Some(technology) = read_attr(battery, "technology") {
            fields.insert("technology", technology);
        }
        if let Some(voltage) = read_attr(battery, "voltage_now").and_then(|v| v.parse::<i64>().ok())
        {
            fields.insert("voltage_uv", voltage);
        }
        fields.insert("plugged", Self::plugged(&supplies));

        Ok(fields)
    }
}

/// Wi-Fi and mobile interface state from `/sys/class/net`
///
/// Wi-Fi keys: `wifi_connected`, `wifi_interface`, `wifi_mac`, `wifi_ip`,
/// `wifi_ssid`, `wifi_link_speed`. Mobile keys: `mobile_connected` and
/// `mobile_interface`. Linux exposes no radio subtype or operator through
/// sysfs, so `mobile_subtype`, `carrier` and `operator` are never reported
/// by this source.
#[derive(Debug, Clone)]
pub struct SysfsNetworkSource {
    net_dir: PathBuf,
    /// Command printing the SSID of an interface, e.g. `iwgetid -r`
    ssid_command: Option<String>,
}

impl SysfsNetworkSource {
    pub const DEFAULT_DIR: &'static str = "/sys/class/net";

    pub fn new(net_dir: impl Into<PathBuf>) -> Self {
        Self {
            net_dir: net_dir.into(),
            ssid_command: None,
        }
    }

    pub fn with_ssid_command(mut self, command: impl Into<String>) -> Self {
        self.ssid_command = Some(command.into());
        self
    }

    fn is_wireless(iface: &Path) -> bool {
        iface.join("wireless").is_dir() || iface.join("phy80211").exists()
    }

    fn is_mobile(iface: &Path) -> bool {
        iface
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("wwan") || n.starts_with("rmnet"))
    }

    fn is_up(iface: &Path) -> bool {
        read_attr(iface, "operstate").is_some_and(|s| s == "up")
    }

    /// Best effort SSID lookup; failures leave the SSID unreported
    fn ssid(&self, interface: &str) -> Option<String> {
        let command_line = self.ssid_command.as_deref()?;
        let mut parts = command_line.split_whitespace();
        let program = parts.next()?;
        match Command::new(program).args(parts).arg(interface).output() {
            Ok(output) if output.status.success() => {
                let ssid = String::from_utf8_lossy(&output.stdout).trim().to_string();
                (!ssid.is_empty()).then_some(ssid)
            }
            Ok(output) => {
                debug!("SSID lookup for {} exited with {}", interface, output.status);
                None
            }
            Err(e) => {
                warn!("SSID lookup for {} failed: {}", interface, e);
                None
            }
        }
    }
}

impl Default for SysfsNetworkSource {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIR).with_ssid_command("iwgetid -r")
    }
}

impl PlatformFieldSource for SysfsNetworkSource {
    fn read(&self) -> Result<FieldMap, CollectorError> {
        let interfaces = list_dirs(&self.net_dir, "net")?;
        let mut fields = FieldMap::new();

        let wifi = interfaces
            .iter()
            .filter(|iface| Self::is_wireless(iface))
            .max_by_key(|iface| Self::is_up(iface));

        match wifi {
            Some(iface) => {
                let name = iface
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let connected = Self::is_up(iface);
                fields.insert("wifi_connected", connected);
                fields.insert("wifi_interface", name.as_str());
                if let Some(mac) = read_attr(iface, "address") {
                    fields.insert("wifi_mac", mac);
                }
                if connected {
                    if let Some(ip) = ipv4_address(&name) {
                        fields.insert("wifi_ip", ip.to_string());
                    }
                    if let Some(ssid) = self.ssid(&name) {
                        fields.insert("wifi_ssid", ssid);
                    }
                    if let Some(speed) = read_attr(iface, "speed")
                        .and_then(|v| v.parse::<i64>().ok())
                        .filter(|v| *v > 0)
                    {
                        fields.insert("wifi_link_speed", speed);
                    }
                }
            }
            None => fields.insert("wifi_connected", false),
        }

        match interfaces.iter().find(|iface| Self::is_mobile(iface)) {
            Some(iface) => {
                fields.insert("mobile_connected", Self::is_up(iface));
                if let Some(name) = iface.file_name() {
                    fields.insert("mobile_interface", name.to_string_lossy().into_owned());
                }
            }
            None => fields.insert("mobile_connected", false),
        }

        Ok(fields)
    }
}

/// First IPv4 address assigned to `interface`
fn ipv4_address(interface: &str) -> Option<Ipv4Addr> {
    let mut addrs: *mut libc::ifaddrs = std::ptr::null_mut();
    // SAFETY: getifaddrs fills `addrs` with a list we own until freeifaddrs
    if unsafe { libc::getifaddrs(&mut addrs) } != 0 {
        return None;
    }

    let mut found = None;
    let mut cursor = addrs;
    while !cursor.is_null() {
        // SAFETY: `cursor` is a live node of the list returned above
        let entry = unsafe { &*cursor };
        cursor = entry.ifa_next;

        if entry.ifa_addr.is_null() || entry.ifa_name.is_null() {
            continue;
        }
        // SAFETY: ifa_name is a NUL-terminated string owned by the list
        let name = unsafe { CStr::from_ptr(entry.ifa_name) };
        if name.to_bytes() != interface.as_bytes() {
            continue;
        }
        // SAFETY: ifa_addr is non-null and sa_family tells us its layout
        let family = unsafe { (*entry.ifa_addr).sa_family };
        if i32::from(family) == libc::AF_INET {
            // SAFETY: AF_INET addresses are laid out as sockaddr_in
            let sin = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_in) };
            found = Some(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)));
            break;
        }
    }

    // SAFETY: `addrs` came from a successful getifaddrs call
    unsafe { libc::freeifaddrs(addrs) };
    found
}
