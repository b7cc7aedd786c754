/// Error types for collectors, history and configuration
pub mod error;

/// Byte count formatting
pub mod units;

/// Injected logging collaborator
pub mod diagnostics;

/// Tolerant numeric field extraction from text
pub mod extract;

/// Bounded sample history
pub mod history;

/// Timestamped metric samples
pub mod samples;

/// Structured collector summaries
pub mod summary;

/// Raw data sources consumed by collectors
pub mod sources;

/// Metric collectors and the polling contract
pub mod collectors;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use collectors::{build_collectors, Collector};
pub use config::Config;
pub use error::{CollectorError, ConfigError, HistoryError, PatternError};
pub use history::HistoryCache;
pub use samples::Sample;
pub use summary::Summary;
