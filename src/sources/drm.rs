//! Display connector state read from `/sys/class/drm`
//!
//! Each connector directory (`card0-eDP-1`, `card0-HDMI-A-1`, ...) carries a
//! `status` attribute, the supported `modes` with the preferred one first and
//! the raw `edid` block of the attached panel.

use super::sysfs::{list_dirs, read_attr};
use super::{FieldMap, PlatformFieldSource};
use crate::error::CollectorError;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed 8-byte header every EDID block starts with
const EDID_HEADER: [u8; 8] = [0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];

/// Offsets of the maximum image size in centimetres
const EDID_WIDTH_CM: usize = 21;
const EDID_HEIGHT_CM: usize = 22;

/// Resolution and physical size of the first connected display
///
/// Reports `connector`, `width_px` and `height_px` from the preferred mode
/// and, when the panel's EDID carries a physical size, `width_mm` and
/// `height_mm`.
#[derive(Debug, Clone)]
pub struct DrmDisplaySource {
    drm_dir: PathBuf,
}

impl DrmDisplaySource {
    pub const DEFAULT_DIR: &'static str = "/sys/class/drm";

    pub fn new(drm_dir: impl Into<PathBuf>) -> Self {
        Self {
            drm_dir: drm_dir.into(),
        }
    }
}

impl Default for DrmDisplaySource {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIR)
    }
}

/// Parse a mode line such as `1920x1080` or `1920x1080i`
pub fn parse_mode(mode: &str) -> Option<(i64, i64)> {
    let (width, height) = mode.trim().split_once('x')?;
    let height: String = height.chars().take_while(char::is_ascii_digit).collect();
    let width = width.parse().ok()?;
    let height = height.parse().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

/// Physical image size in millimetres from an EDID block
pub fn edid_size_mm(edid: &[u8]) -> Option<(i64, i64)> {
    if edid.len() <= EDID_HEIGHT_CM || edid[..EDID_HEADER.len()] != EDID_HEADER {
        return None;
    }
    let width = i64::from(edid[EDID_WIDTH_CM]);
    let height = i64::from(edid[EDID_HEIGHT_CM]);
    // Zero means the size is undefined, e.g. projectors
    (width > 0 && height > 0).then_some((width * 10, height * 10))
}

fn is_connected(connector: &Path) -> bool {
    read_attr(connector, "status").is_some_and(|s| s == "connected")
}

impl PlatformFieldSource for DrmDisplaySource {
    fn read(&self) -> Result<FieldMap, CollectorError> {
        let connectors = list_dirs(&self.drm_dir, "drm")?;
        let connector = connectors
            .iter()
            .find(|dir| is_connected(dir))
            .ok_or_else(|| {
                CollectorError::acquisition(
                    "drm",
                    format!("no connected display under {}", self.drm_dir.display()),
                )
            })?;
        debug!("Reading display state from {}", connector.display());

        let mut fields = FieldMap::new();
        if let Some(name) = connector.file_name().and_then(|n| n.to_str()) {
            fields.insert("connector", name);
        }

        let preferred = read_attr(connector, "modes")
            .and_then(|modes| modes.lines().next().and_then(parse_mode));
        if let Some((width, height)) = preferred {
            fields.insert("width_px", width);
            fields.insert("height_px", height);
        }

        let size = fs::read(connector.join("edid"))
            .ok()
            .and_then(|edid| edid_size_mm(&edid));
        if let Some((width, height)) = size {
            fields.insert("width_mm", width);
            fields.insert("height_mm", height);
        }

        Ok(fields)
    }
}
