/// Configuration file schema and loading
#[allow(clippy::module_inception)]
pub mod config;

pub use config::{
    BatteryConfig, Config, CpuConfig, DisplayConfig, ExtraPatterns, HistoryConfig, MemoryConfig, NetworkConfig,
    OutputConfig, ProcessesConfig, ServicesConfig, StorageConfig,
};
