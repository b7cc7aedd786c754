use super::RawTextSource;
use crate::error::CollectorError;
use log::debug;
use std::io::ErrorKind;
use std::process::Command;

/// Runs a program and captures its standard output
///
/// The process is waited on inside `run`, so its pipes are closed before
/// the call returns regardless of the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a command line split on whitespace, e.g. `"top -b -n 1"`
    ///
    /// Returns `None` for a blank command line.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl RawTextSource for CommandSource {
    fn run(&self) -> Result<String, CollectorError> {
        debug!("Running {}", self.describe());

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied => CollectorError::AccessDenied(format!(
                    "{}: {}",
                    self.program, e
                )),
                _ => CollectorError::acquisition(self.describe(), e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CollectorError::acquisition(
                self.describe(),
                format!("{} {}", output.status, stderr.trim()).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}
