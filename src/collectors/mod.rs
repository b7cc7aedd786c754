//! Polling contract shared by every metric collector
//!
//! A collector acquires raw data through an injected source, turns it into
//! typed state and renders that state as a `Summary`. State is replaced
//! wholesale by a successful poll and left untouched by a failed one.

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::error::CollectorError;
use crate::extract::{add_alternative, Extraction, FieldPattern, MetricExtractor};
use crate::history::HistoryCache;
use crate::samples::Sample;
use crate::sources::{
    CommandSource, DrmDisplaySource, FileSource, ProcfsProcessSource, RawTextSource,
    StatvfsStorageSource, SysfsBatterySource, SysfsNetworkSource, SystemctlServiceSource,
};
use crate::summary::Summary;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Battery charge and plug state
pub mod battery;

/// CPU utilisation parsed from `top` output
pub mod cpu;

/// Memory counters parsed from `/proc/meminfo`
pub mod memory;

/// Internal and external volume capacity
pub mod storage;

/// Wi-Fi and mobile network state
pub mod network;

/// Resolution and pixel density of the connected display
pub mod display;

/// Running process list
pub mod processes;

/// Running service list
pub mod services;

pub use battery::{BatteryCollector, BatteryState, PlugType};
pub use cpu::{CpuCollector, CpuUsage};
pub use display::{DisplayCollector, DisplayState, SizeCategory};
pub use memory::{MemoryCollector, MemoryUsage};
pub use network::{
    parse_mcc_mnc, AccessPoint, MobileGeneration, MobileInfo, NetworkCollector, NetworkState,
    ScanInbox, WifiInfo,
};
pub use processes::{ProcessCollector, ProcessInfo, ProcessList};
pub use services::{ServiceCollector, ServiceInfo, ServiceList};
pub use storage::{ExternalState, StorageCollector, StorageState, VolumeInfo};

/// A pollable metric source
pub trait Collector: Send {
    /// Stable lowercase identifier, e.g. `cpu`
    fn name(&self) -> &str;

    /// Acquire fresh data and replace the current state
    ///
    /// # Errors
    ///
    /// Returns `CollectorError` when acquisition fails or the raw data holds
    /// nothing recognisable. The previous state is kept in that case.
    fn poll(&mut self) -> Result<(), CollectorError>;

    /// Render the current state; never fails
    fn summary(&self) -> Summary;

    /// Samples recorded by past polls, for collectors that keep history
    fn history(&self) -> Option<&HistoryCache<Sample>> {
        None
    }
}

/// Names accepted by `build_collectors`, in build order
pub const COLLECTOR_NAMES: [&str; 8] = [
    "battery",
    "cpu",
    "memory",
    "storage",
    "network",
    "display",
    "processes",
    "services",
];

/// Assemble the collectors enabled in `config`
///
/// Collectors are returned in the order of `COLLECTOR_NAMES`.
///
/// # Errors
///
/// Returns `CollectorError::InvalidPattern` if a configured extra pattern
/// does not compile, or `CollectorError::Acquisition` for a blank command
/// line.
pub fn build_collectors(
    config: &Config,
    diagnostics: Arc<dyn Diagnostics>,
) -> Result<Vec<Box<dyn Collector>>, CollectorError> {
    let mut collectors: Vec<Box<dyn Collector>> = Vec::new();
    let max_entries = config.history.max_entries;

    if config.battery.enabled {
        let source = SysfsBatterySource::new(&config.battery.power_supply_dir);
        collectors.push(Box::new(BatteryCollector::new(Box::new(source))));
    }

    if config.cpu.enabled {
        let source = CommandSource::from_command_line(&config.cpu.command)
            .ok_or_else(|| CollectorError::acquisition("cpu", "empty command line"))?;
        let mut cpu = CpuCollector::new(Box::new(source), Arc::clone(&diagnostics), max_entries)?;
        cpu.add_patterns(&config.cpu.extra_patterns)?;
        collectors.push(Box::new(cpu));
    }

    if config.memory.enabled {
        let source = FileSource::new(&config.memory.path);
        let mut memory =
            MemoryCollector::new(Box::new(source), Arc::clone(&diagnostics), max_entries)?;
        memory.add_patterns(&config.memory.extra_patterns)?;
        collectors.push(Box::new(memory));
    }

    if config.storage.enabled {
        let source = StatvfsStorageSource::new(
            &config.storage.internal_path,
            config.storage.external_path.clone(),
        );
        collectors.push(Box::new(StorageCollector::new(Box::new(source))));
    }

    if config.network.enabled {
        let mut source = SysfsNetworkSource::new(&config.network.net_dir);
        if let Some(command) = config.network.ssid_lookup() {
            source = source.with_ssid_command(command);
        }
        collectors.push(Box::new(NetworkCollector::new(Box::new(source))));
    }

    if config.display.enabled {
        let source = DrmDisplaySource::new(&config.display.drm_dir);
        collectors.push(Box::new(DisplayCollector::new(Box::new(source))));
    }

    if config.processes.enabled {
        let source = ProcfsProcessSource::new(&config.processes.proc_dir);
        collectors.push(Box::new(ProcessCollector::new(
            Box::new(source),
            config.processes.limit,
        )));
    }

    if config.services.enabled {
        let source = SystemctlServiceSource::from_command_line(&config.services.command)?;
        collectors.push(Box::new(ServiceCollector::new(Box::new(source))));
    }

    info!("Built {} collectors", collectors.len());
    for collector in &collectors {
        debug!("Collector enabled: {}", collector.name());
    }

    Ok(collectors)
}

/// Run `source` through the extractor
///
/// Fails with `CollectorError::Unrecognized` when the text is blank or no
/// pattern matched at all; partial matches are accepted.
pub(crate) fn extract_text(
    source: &dyn RawTextSource,
    extractor: &MetricExtractor,
    patterns: &[FieldPattern],
) -> Result<Extraction, CollectorError> {
    let raw = source.run()?;
    let extraction = extractor.extract(&raw, patterns);
    if !extraction.matched_any() {
        return Err(CollectorError::Unrecognized(source.describe()));
    }
    Ok(extraction)
}

/// Append configured alternatives after the built-in ones
pub(crate) fn add_extra_patterns(
    collector: &str,
    patterns: &mut [FieldPattern],
    extra: &BTreeMap<String, Vec<String>>,
) -> Result<(), CollectorError> {
    for (field, alternatives) in extra {
        for alternative in alternatives {
            if !add_alternative(patterns, field, alternative)? {
                warn!("{}: no field named '{}', ignoring pattern", collector, field);
                break;
            }
        }
    }
    Ok(())
}
