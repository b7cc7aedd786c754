use super::{FieldMap, PlatformListSource};
use crate::error::CollectorError;
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Running processes from `/proc/<pid>/status` and `/proc/<pid>/cmdline`
///
/// Keys per record: `pid`, `name`, `state`, `threads`, `rss_kb` (absent for
/// kernel threads) and `command` (absent when the command line is empty).
#[derive(Debug, Clone)]
pub struct ProcfsProcessSource {
    proc_dir: PathBuf,
}

impl ProcfsProcessSource {
    pub const DEFAULT_DIR: &'static str = "/proc";

    pub fn new(proc_dir: impl Into<PathBuf>) -> Self {
        Self {
            proc_dir: proc_dir.into(),
        }
    }

    /// Read one process; `None` when it exited while being read
    fn read_process(dir: &Path, pid: i64) -> Option<FieldMap> {
        let status = fs::read_to_string(dir.join("status")).ok()?;
        let mut record = parse_status(&status);
        record.insert("pid", pid);

        if let Ok(raw) = fs::read(dir.join("cmdline")) {
            let command = raw
                .split(|b| *b == 0)
                .filter(|part| !part.is_empty())
                .map(|part| String::from_utf8_lossy(part).into_owned())
                .collect::<Vec<_>>()
                .join(" ");
            if !command.is_empty() {
                record.insert("command", command);
            }
        }
        Some(record)
    }
}

impl Default for ProcfsProcessSource {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIR)
    }
}

impl PlatformListSource for ProcfsProcessSource {
    fn list(&self) -> Result<Vec<FieldMap>, CollectorError> {
        let entries = fs::read_dir(&self.proc_dir).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => {
                CollectorError::AccessDenied(format!("{}: {}", self.proc_dir.display(), e))
            }
            _ => CollectorError::acquisition(
                self.proc_dir.display().to_string(),
                e.to_string(),
            ),
        })?;

        let mut processes = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<i64>().ok())
            else {
                continue;
            };
            match Self::read_process(&entry.path(), pid) {
                Some(record) => processes.push(record),
                None => debug!("Process {} vanished while reading", pid),
            }
        }

        processes.sort_by_key(|p| p.get_i64("pid").unwrap_or_default());
        Ok(processes)
    }
}

/// Parse the `Key:\tvalue` lines of a status file
fn parse_status(status: &str) -> FieldMap {
    let mut record = FieldMap::new();
    for line in status.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key {
            "Name" => record.insert("name", value),
            // "S (sleeping)" -> "sleeping"
            "State" => {
                let state = value
                    .split_once('(')
                    .map(|(_, rest)| rest.trim_end_matches(')'))
                    .unwrap_or(value);
                record.insert("state", state);
            }
            "Threads" => {
                if let Ok(threads) = value.parse::<i64>() {
                    record.insert("threads", threads);
                }
            }
            "VmRSS" => {
                let kb = value.trim_end_matches("kB").trim();
                if let Ok(kb) = kb.parse::<i64>() {
                    record.insert("rss_kb", kb);
                }
            }
            _ => {}
        }
    }
    record
}
