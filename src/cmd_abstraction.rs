//! External command execution behind a trait.
//!
//! Every call to the cloud CLI goes through [`CommandExecutor`], so the
//! firewall adapter can be driven by a mock in unit tests.

use anyhow::{Context, Result};
use std::process::{Command, Stdio};

#[cfg(test)]
use mockall::automock;

/// Captured result of one command invocation
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code 0
    pub success: bool,
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Shorthand for a successful run with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    /// Shorthand for a failed run with the given stderr.
    pub fn failed(stderr: impl Into<String>, code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            code: Some(code),
        }
    }

    /// A one-line description of why the command failed, for log messages.
    ///
    /// The cloud CLI prints multi-line errors prefixed with `ERROR:`; the
    /// first non-empty stderr line is what an operator needs to act on.
    pub fn failure_reason(&self) -> String {
        let line = self
            .stderr
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(|l| l.trim_start_matches("ERROR:").trim().to_string());

        match (line, self.code) {
            (Some(l), _) if !l.is_empty() => l,
            (_, Some(code)) => format!("exit code {}", code),
            (_, None) => "terminated by signal".to_string(),
        }
    }
}

#[cfg_attr(test, automock)]
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args` to completion and capture its output.
    ///
    /// An `Err` means the process could not be started at all (for
    /// instance the program is not installed); a non-zero exit is reported
    /// through [`CommandOutput::success`].
    fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs real processes via `std::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct RealCommandExecutor;

impl RealCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to execute {}", program))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

/// mockall cannot express `&[&str]` cleanly, so the trait takes `&[String]`.
pub fn args_to_strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
