use super::RawTextSource;
use crate::error::CollectorError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads a whole text file, e.g. `/proc/meminfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RawTextSource for FileSource {
    fn run(&self) -> Result<String, CollectorError> {
        fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => {
                CollectorError::AccessDenied(format!("{}: {}", self.path.display(), e))
            }
            _ => CollectorError::acquisition(self.describe(), e.to_string()),
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
