use crate::error::ConfigError;
use crate::history::DEFAULT_MAX_ENTRIES;
use crate::sources::{
    systemd, DrmDisplaySource, ProcfsProcessSource, SysfsBatterySource, SysfsNetworkSource,
};
use crate::units::SizeUnit;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound for `history.max_entries`
const MAX_HISTORY_ENTRIES: usize = 10_000;

/// Extra pattern alternatives keyed by field name
pub type ExtraPatterns = BTreeMap<String, Vec<String>>;

/// Top-level configuration loaded from TOML
///
/// Every section is optional; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log target used for parser diagnostics
    pub log_tag: String,
    pub history: HistoryConfig,
    pub output: OutputConfig,
    pub cpu: CpuConfig,
    pub memory: MemoryConfig,
    pub battery: BatteryConfig,
    pub storage: StorageConfig,
    pub network: NetworkConfig,
    pub display: DisplayConfig,
    pub processes: ProcessesConfig,
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Samples retained per collector
    pub max_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Unit for byte counts in text output
    pub units: SizeUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    pub enabled: bool,
    /// Command printing a process-table header, e.g. `top -b -n 1`
    pub command: String,
    pub extra_patterns: ExtraPatterns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub extra_patterns: ExtraPatterns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    pub enabled: bool,
    pub power_supply_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub enabled: bool,
    pub internal_path: PathBuf,
    /// Mount point of removable media; absent when not configured
    pub external_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub enabled: bool,
    pub net_dir: PathBuf,
    /// Command printing the SSID of the interface passed as last argument;
    /// an empty string turns the lookup off
    pub ssid_command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub enabled: bool,
    pub drm_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessesConfig {
    pub enabled: bool,
    pub proc_dir: PathBuf,
    /// Processes listed per poll, largest first
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub enabled: bool,
    pub command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_tag: "devprobe".to_string(),
            history: HistoryConfig::default(),
            output: OutputConfig::default(),
            cpu: CpuConfig::default(),
            memory: MemoryConfig::default(),
            battery: BatteryConfig::default(),
            storage: StorageConfig::default(),
            network: NetworkConfig::default(),
            display: DisplayConfig::default(),
            processes: ProcessesConfig::default(),
            services: ServicesConfig::default(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "top -b -n 1".to_string(),
            extra_patterns: ExtraPatterns::new(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("/proc/meminfo"),
            extra_patterns: ExtraPatterns::new(),
        }
    }
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            power_supply_dir: PathBuf::from(SysfsBatterySource::DEFAULT_DIR),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            internal_path: PathBuf::from("/"),
            external_path: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            net_dir: PathBuf::from(SysfsNetworkSource::DEFAULT_DIR),
            ssid_command: Some("iwgetid -r".to_string()),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            drm_dir: PathBuf::from(DrmDisplaySource::DEFAULT_DIR),
        }
    }
}

impl Default for ProcessesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            proc_dir: PathBuf::from(ProcfsProcessSource::DEFAULT_DIR),
            limit: 20,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: systemd::DEFAULT_COMMAND.to_string(),
        }
    }
}

impl NetworkConfig {
    /// SSID lookup command, or `None` when unset or blank
    pub fn ssid_lookup(&self) -> Option<&str> {
        self.ssid_command
            .as_deref()
            .filter(|command| !command.trim().is_empty())
    }
}

impl Config {
    /// Load and validate a TOML configuration file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::TomlError` if it is not valid TOML for this schema, and
    /// `ConfigError::ValidationError` if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and that configured patterns compile
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_tag.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "log_tag must not be empty".to_string(),
            ));
        }

        if self.history.max_entries == 0 || self.history.max_entries > MAX_HISTORY_ENTRIES {
            return Err(ConfigError::ValidationError(format!(
                "history.max_entries must be between 1 and {}, got {}",
                MAX_HISTORY_ENTRIES, self.history.max_entries
            )));
        }

        if self.cpu.enabled && self.cpu.command.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "cpu.command must not be empty".to_string(),
            ));
        }

        if self.services.enabled && self.services.command.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "services.command must not be empty".to_string(),
            ));
        }

        if self.processes.limit == 0 {
            return Err(ConfigError::ValidationError(
                "processes.limit must be at least 1".to_string(),
            ));
        }

        Self::validate_patterns("cpu", &self.cpu.extra_patterns)?;
        Self::validate_patterns("memory", &self.memory.extra_patterns)?;

        Ok(())
    }

    fn validate_patterns(section: &str, patterns: &ExtraPatterns) -> Result<(), ConfigError> {
        for (field, alternatives) in patterns {
            for alternative in alternatives {
                if let Err(e) = Regex::new(alternative) {
                    return Err(ConfigError::ValidationError(format!(
                        "{}.extra_patterns.{}: {}",
                        section, field, e
                    )));
                }
            }
        }
        Ok(())
    }
}
