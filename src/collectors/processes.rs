use super::Collector;
use crate::error::CollectorError;
use crate::samples::Timestamp;
use crate::sources::{FieldMap, PlatformListSource};
use crate::summary::{Summary, SummaryValue};
use crate::units::BYTES_PER_KB;
use chrono::Utc;
use log::debug;
use serde::Serialize;

/// One running process
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessInfo {
    pub pid: i64,
    pub name: String,
    pub state: Option<String>,
    /// Resident set size in bytes; `None` for kernel threads
    pub resident_bytes: Option<i64>,
    pub threads: Option<i64>,
    pub command: Option<String>,
}

impl ProcessInfo {
    /// `None` for records without a pid
    fn from_fields(fields: &FieldMap) -> Option<Self> {
        let pid = fields.get_i64("pid")?;
        Some(Self {
            pid,
            name: fields
                .get_text("name")
                .map(str::to_string)
                .unwrap_or_else(|| format!("pid {}", pid)),
            state: fields.get_text("state").map(str::to_string),
            resident_bytes: fields
                .get_i64("rss_kb")
                .map(|kb| (kb as f64 * BYTES_PER_KB) as i64),
            threads: fields.get_i64("threads"),
            command: fields.get_text("command").map(str::to_string),
        })
    }
}

/// Process list from one poll, largest resident memory first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessList {
    pub polled_at: Timestamp,
    /// Processes seen before the limit was applied
    pub total: usize,
    pub processes: Vec<ProcessInfo>,
}

/// Process collector over a platform list source
///
/// Every poll replaces the list; it never accumulates across polls.
pub struct ProcessCollector {
    source: Box<dyn PlatformListSource>,
    limit: usize,
    state: Option<ProcessList>,
}

impl ProcessCollector {
    /// Keep at most `limit` processes per poll
    pub fn new(source: Box<dyn PlatformListSource>, limit: usize) -> Self {
        Self {
            source,
            limit,
            state: None,
        }
    }

    pub fn list(&self) -> Option<&ProcessList> {
        self.state.as_ref()
    }

    pub fn processes(&self) -> &[ProcessInfo] {
        self.state
            .as_ref()
            .map(|s| s.processes.as_slice())
            .unwrap_or(&[])
    }
}

impl Collector for ProcessCollector {
    fn name(&self) -> &str {
        "processes"
    }

    fn poll(&mut self) -> Result<(), CollectorError> {
        let records = self.source.list()?;
        let mut processes: Vec<ProcessInfo> =
            records.iter().filter_map(ProcessInfo::from_fields).collect();
        if processes.is_empty() {
            return Err(CollectorError::Unrecognized("processes".to_string()));
        }

        let total = processes.len();
        processes.sort_by(|a, b| {
            b.resident_bytes
                .unwrap_or(0)
                .cmp(&a.resident_bytes.unwrap_or(0))
                .then(a.pid.cmp(&b.pid))
        });
        processes.truncate(self.limit);
        debug!("Listed {} processes, keeping {}", total, processes.len());

        self.state = Some(ProcessList {
            polled_at: Utc::now(),
            total,
            processes,
        });
        Ok(())
    }

    fn summary(&self) -> Summary {
        let mut summary =
            Summary::new("Running Processes", self.state.as_ref().map(|s| s.polled_at));
        let Some(list) = &self.state else {
            return summary.entry("Process Count", SummaryValue::Unknown);
        };

        summary.push("Process Count", SummaryValue::Number(list.total as f64));
        for process in &list.processes {
            summary.push(
                format!("{} ({})", process.name, process.pid),
                SummaryValue::bytes_or_unknown(process.resident_bytes),
            );
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockPlatformListSource;

    fn process(pid: i64, name: &str, rss_kb: Option<i64>) -> FieldMap {
        let mut record = FieldMap::new()
            .with("pid", pid)
            .with("name", name)
            .with("state", "sleeping")
            .with("threads", 1i64);
        if let Some(kb) = rss_kb {
            record.insert("rss_kb", kb);
        }
        record
    }

    fn collector(
        lists: Vec<Result<Vec<FieldMap>, CollectorError>>,
        limit: usize,
    ) -> ProcessCollector {
        let mut source = MockPlatformListSource::new();
        let mut lists = lists.into_iter();
        source
            .expect_list()
            .returning(move || lists.next().unwrap_or_else(|| Ok(Vec::new())));
        ProcessCollector::new(Box::new(source), limit)
    }

    #[test]
    fn test_sorted_by_resident_memory_and_limited() {
        let mut collector = collector(
            vec![Ok(vec![
                process(1, "init", Some(4_000)),
                process(2, "kthreadd", None),
                process(812, "sshd", Some(7_424)),
                process(900, "bash", Some(5_000)),
            ])],
            2,
        );
        collector.poll().unwrap();

        let list = collector.list().unwrap();
        assert_eq!(list.total, 4);
        let names: Vec<&str> = list.processes.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["sshd", "bash"]);
        assert_eq!(list.processes[0].resident_bytes, Some(7_424 * 1024));

        let summary = collector.summary();
        assert_eq!(summary.get("Process Count"), Some(&SummaryValue::Number(4.0)));
        assert_eq!(summary.get("sshd (812)"), Some(&SummaryValue::Bytes(7_424 * 1024)));
    }

    #[test]
    fn test_list_is_replaced_not_accumulated() {
        let mut collector = collector(
            vec![
                Ok(vec![process(1, "init", Some(10)), process(2, "a", Some(5))]),
                Ok(vec![process(3, "b", Some(1))]),
            ],
            20,
        );
        collector.poll().unwrap();
        assert_eq!(collector.processes().len(), 2);

        collector.poll().unwrap();
        assert_eq!(collector.processes().len(), 1);
        assert_eq!(collector.processes()[0].pid, 3);
    }

    #[test]
    fn test_records_without_pid_are_skipped() {
        let mut collector = collector(
            vec![
                Ok(vec![process(7, "x", Some(1))]),
                Ok(vec![FieldMap::new().with("name", "ghost")]),
            ],
            20,
        );
        collector.poll().unwrap();
        let before = collector.summary();

        assert!(matches!(collector.poll(), Err(CollectorError::Unrecognized(_))));
        assert_eq!(collector.summary(), before);
    }

    #[test]
    fn test_failed_poll_keeps_state() {
        let mut collector = collector(
            vec![
                Ok(vec![process(7, "x", Some(1))]),
                Err(CollectorError::AccessDenied("/proc".to_string())),
            ],
            20,
        );
        collector.poll().unwrap();
        let before = collector.summary();

        assert!(collector.poll().is_err());
        assert_eq!(collector.summary(), before);
    }

    #[test]
    fn test_summary_before_first_poll() {
        let collector = collector(vec![], 20);
        assert!(collector.processes().is_empty());
        let summary = collector.summary();
        assert!(summary.polled_at.is_none());
        assert_eq!(summary.get("Process Count"), Some(&SummaryValue::Unknown));
    }
}
