use thiserror::Error;

/// Errors that can occur while polling a collector
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Failed to acquire data from {source_name}: {reason}")]
    Acquisition { source_name: String, reason: String },

    #[error("Access denied by platform: {0}")]
    AccessDenied(String),

    #[error("Output from {0} contained none of the expected fields")]
    Unrecognized(String),

    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CollectorError {
    /// Shorthand for an acquisition failure on a named source
    pub fn acquisition(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        CollectorError::Acquisition {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// A field pattern alternative that failed to compile
#[derive(Error, Debug)]
#[error("Invalid pattern for field '{field}': {source}")]
pub struct PatternError {
    pub field: String,
    #[source]
    pub source: regex::Error,
}

/// Contract violations on a history cache
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("History entry is absent")]
    NullEntry,

    #[error("History index {index} out of range (size {size})")]
    IndexOutOfRange { index: usize, size: usize },
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_error_message() {
        let err = CollectorError::acquisition("top", "exit status 1");
        assert_eq!(
            err.to_string(),
            "Failed to acquire data from top: exit status 1"
        );
    }

    #[test]
    fn test_history_error_message() {
        let err = HistoryError::IndexOutOfRange { index: 7, size: 3 };
        assert_eq!(err.to_string(), "History index 7 out of range (size 3)");
        assert_eq!(HistoryError::NullEntry.to_string(), "History entry is absent");
    }

    #[test]
    fn test_pattern_error_converts_to_collector_error() {
        let source = regex::Regex::new("(unclosed").unwrap_err();
        let err: CollectorError = PatternError {
            field: "user".to_string(),
            source,
        }
        .into();
        assert!(matches!(err, CollectorError::InvalidPattern(_)));
        assert!(err.to_string().contains("'user'"));
    }
}
