use super::{CommandSource, FieldMap, PlatformListSource, RawTextSource};
use crate::error::CollectorError;

/// Default listing of running service units
pub const DEFAULT_COMMAND: &str =
    "systemctl list-units --type=service --state=running --no-legend --no-pager --plain";

/// Running services as reported by `systemctl list-units`
///
/// Keys per record: `unit`, `load`, `active`, `sub` and `description`.
pub struct SystemctlServiceSource {
    command: Box<dyn RawTextSource>,
}

impl SystemctlServiceSource {
    pub fn new(command: Box<dyn RawTextSource>) -> Self {
        Self { command }
    }

    /// Build from a command line
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::Acquisition` for a blank command line.
    pub fn from_command_line(command_line: &str) -> Result<Self, CollectorError> {
        let command = CommandSource::from_command_line(command_line)
            .ok_or_else(|| CollectorError::acquisition("services", "empty command line"))?;
        Ok(Self::new(Box::new(command)))
    }
}

impl PlatformListSource for SystemctlServiceSource {
    fn list(&self) -> Result<Vec<FieldMap>, CollectorError> {
        let output = self.command.run()?;
        Ok(parse_units(&output))
    }
}

/// Parse `UNIT LOAD ACTIVE SUB DESCRIPTION...` rows
///
/// Rows with fewer than four columns are skipped.
pub fn parse_units(output: &str) -> Vec<FieldMap> {
    output
        .lines()
        .filter_map(|line| {
            // Some systemd versions prefix failed units with a bullet
            let line = line.trim().trim_start_matches('●').trim_start();
            let mut columns = line.split_whitespace();
            let unit = columns.next()?;
            let load = columns.next()?;
            let active = columns.next()?;
            let sub = columns.next()?;
            let description = columns.collect::<Vec<_>>().join(" ");

            let mut record = FieldMap::new()
                .with("unit", unit)
                .with("load", load)
                .with("active", active)
                .with("sub", sub);
            if !description.is_empty() {
                record.insert("description", description);
            }
            Some(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockRawTextSource;

    const LISTING: &str = "\
cron.service      loaded active running Regular background program processing daemon
dbus.service      loaded active running D-Bus System Message Bus
ssh.service       loaded active running OpenBSD Secure Shell server
";

    #[test]
    fn test_parse_units() {
        let units = parse_units(LISTING);
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].get_text("unit"), Some("cron.service"));
        assert_eq!(units[0].get_text("active"), Some("active"));
        assert_eq!(units[0].get_text("sub"), Some("running"));
        assert_eq!(
            units[0].get_text("description"),
            Some("Regular background program processing daemon")
        );
        assert_eq!(units[2].get_text("unit"), Some("ssh.service"));
    }

    #[test]
    fn test_parse_skips_short_rows() {
        let units = parse_units("\n  \nbroken.service loaded\n● x.service loaded failed failed\n");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].get_text("unit"), Some("x.service"));
        assert!(!units[0].contains("description"));
    }

    #[test]
    fn test_list_uses_command_output() {
        let mut command = MockRawTextSource::new();
        command
            .expect_run()
            .times(1)
            .returning(|| Ok(LISTING.to_string()));

        let source = SystemctlServiceSource::new(Box::new(command));
        assert_eq!(source.list().unwrap().len(), 3);
    }

    #[test]
    fn test_list_propagates_command_failure() {
        let mut command = MockRawTextSource::new();
        command
            .expect_run()
            .returning(|| Err(CollectorError::acquisition("systemctl", "exit status: 1")));

        let source = SystemctlServiceSource::new(Box::new(command));
        assert!(source.list().is_err());
    }

    #[test]
    fn test_blank_command_line_is_rejected() {
        assert!(SystemctlServiceSource::from_command_line("  ").is_err());
    }
}
