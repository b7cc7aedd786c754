//! Byte count formatting with automatic scale selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of bytes in a kilobyte
pub const BYTES_PER_KB: f64 = 1024.0;
/// Number of bytes in a megabyte
pub const BYTES_PER_MB: f64 = 1_048_576.0;
/// Number of bytes in a gigabyte
pub const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Display scale for byte counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeUnit {
    /// Pick KB, MB or GB from the magnitude
    #[default]
    Auto,
    Kb,
    Mb,
    Gb,
}

impl SizeUnit {
    fn suffix(self) -> &'static str {
        match self {
            SizeUnit::Kb => "KB",
            SizeUnit::Mb => "MB",
            SizeUnit::Gb | SizeUnit::Auto => "GB",
        }
    }

    fn divisor(self) -> f64 {
        match self {
            SizeUnit::Kb => BYTES_PER_KB,
            SizeUnit::Mb => BYTES_PER_MB,
            SizeUnit::Gb | SizeUnit::Auto => BYTES_PER_GB,
        }
    }

    /// Resolve `Auto` to a concrete unit for the given magnitude
    ///
    /// KB below 1 MiB, MB below 1 GiB, GB otherwise.
    pub fn resolve(self, bytes: i64) -> SizeUnit {
        match self {
            SizeUnit::Auto => {
                let bytes = bytes as f64;
                if bytes < BYTES_PER_MB {
                    SizeUnit::Kb
                } else if bytes < BYTES_PER_GB {
                    SizeUnit::Mb
                } else {
                    SizeUnit::Gb
                }
            }
            unit => unit,
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeUnit::Auto => write!(f, "auto"),
            unit => write!(f, "{}", unit.suffix()),
        }
    }
}

impl FromStr for SizeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SizeUnit::Auto),
            "kb" => Ok(SizeUnit::Kb),
            "mb" => Ok(SizeUnit::Mb),
            "gb" => Ok(SizeUnit::Gb),
            other => Err(format!("unknown size unit '{}'", other)),
        }
    }
}

/// Convert a byte count into a human-scaled string such as `1.50 KB`
///
/// Returns `None` for negative input.
///
/// # Examples
///
/// ```
/// use devprobe::units::{convert, SizeUnit};
///
/// assert_eq!(convert(1536, SizeUnit::Auto).as_deref(), Some("1.50 KB"));
/// assert_eq!(convert(-5, SizeUnit::Auto), None);
/// ```
pub fn convert(bytes: i64, unit: SizeUnit) -> Option<String> {
    if bytes < 0 {
        return None;
    }

    let unit = unit.resolve(bytes);
    let scaled = bytes as f64 / unit.divisor();
    Some(format!("{:.2} {}", scaled, unit.suffix()))
}

/// Convert a kilobyte count (as reported by `/proc/meminfo`)
pub fn convert_kib(kib: i64, unit: SizeUnit) -> Option<String> {
    convert(kib.checked_mul(1024)?, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_selects_kb_for_small_values() {
        assert_eq!(convert(1536, SizeUnit::Auto).as_deref(), Some("1.50 KB"));
        assert_eq!(convert(512, SizeUnit::Auto).as_deref(), Some("0.50 KB"));
    }

    #[test]
    fn test_auto_has_no_gap_between_kb_and_mb() {
        // 500 KiB sat between the legacy KB and MB branches
        assert_eq!(
            convert(512_000, SizeUnit::Auto).as_deref(),
            Some("500.00 KB")
        );
        assert_eq!(
            convert(1_048_576, SizeUnit::Auto).as_deref(),
            Some("1.00 MB")
        );
    }

    #[test]
    fn test_auto_selects_gb_for_large_values() {
        assert_eq!(
            convert(2_000_000_000, SizeUnit::Auto).as_deref(),
            Some("1.86 GB")
        );
        assert_eq!(
            convert(1_073_741_824, SizeUnit::Auto).as_deref(),
            Some("1.00 GB")
        );
    }

    #[test]
    fn test_zero_bytes() {
        assert_eq!(convert(0, SizeUnit::Auto).as_deref(), Some("0.00 KB"));
    }

    #[test]
    fn test_negative_input_is_absent() {
        assert_eq!(convert(-5, SizeUnit::Auto), None);
        assert_eq!(convert(-1, SizeUnit::Mb), None);
    }

    #[test]
    fn test_explicit_units() {
        assert_eq!(convert(1_048_576, SizeUnit::Kb).as_deref(), Some("1024.00 KB"));
        assert_eq!(convert(3_145_728, SizeUnit::Mb).as_deref(), Some("3.00 MB"));
        assert_eq!(convert(536_870_912, SizeUnit::Gb).as_deref(), Some("0.50 GB"));
    }

    #[test]
    fn test_convert_kib() {
        assert_eq!(convert_kib(2048, SizeUnit::Auto).as_deref(), Some("2.00 MB"));
        assert_eq!(convert_kib(i64::MAX, SizeUnit::Auto), None);
    }

    #[test]
    fn test_size_unit_from_str() {
        assert_eq!("AUTO".parse::<SizeUnit>(), Ok(SizeUnit::Auto));
        assert_eq!("mb".parse::<SizeUnit>(), Ok(SizeUnit::Mb));
        assert!("tb".parse::<SizeUnit>().is_err());
    }

    #[test]
    fn test_size_unit_serialization() {
        assert_eq!(serde_json::to_string(&SizeUnit::Gb).unwrap(), "\"gb\"");
        let unit: SizeUnit = serde_json::from_str("\"kb\"").unwrap();
        assert_eq!(unit, SizeUnit::Kb);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn prop_non_negative_input_always_formats(bytes: u32) -> bool {
        let formatted = convert(bytes as i64, SizeUnit::Auto);
        match formatted {
            Some(s) => s.ends_with(" KB") || s.ends_with(" MB") || s.ends_with(" GB"),
            None => false,
        }
    }

    #[quickcheck]
    fn prop_negative_input_never_formats(bytes: i64) -> bool {
        bytes >= 0 || convert(bytes, SizeUnit::Auto).is_none()
    }
}
