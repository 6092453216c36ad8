//! # Service Management
//!
//! Process control for the managed unit. The reconciler only needs two
//! commands: reload unit definitions after the descriptor changed, and restart
//! the unit after any artifact changed.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod systemctl;

pub use systemctl::SystemctlManager;

#[derive(Debug, Error)]
pub enum ServiceManagerError {
    #[error("Invalid unit name '{0}'")]
    InvalidUnitName(String),
    #[error("Service manager binary not found: {0}")]
    NotFound(String),
    #[error("Failed to execute {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {}", describe_exit(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        output: CommandOutput,
    },
}

impl ServiceManagerError {
    /// Captured output of a failed command, if the command ran at all
    #[must_use]
    pub fn output(&self) -> Option<&CommandOutput> {
        match self {
            ServiceManagerError::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("code {code}"),
        None => "signal".to_string(),
    }
}

/// stdout and stderr captured from a service manager command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (false, false) => write!(f, "{stdout}\n{stderr}"),
            (false, true) => f.write_str(stdout),
            (true, false) => f.write_str(stderr),
            (true, true) => Ok(()),
        }
    }
}

/// Controls the OS service manager
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Re-read unit definitions from disk
    async fn daemon_reload(&self) -> Result<(), ServiceManagerError>;

    /// Restart the named unit, waiting for the command to complete
    async fn restart(&self, unit: &str) -> Result<(), ServiceManagerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_display() {
        let output = CommandOutput {
            stdout: "out\n".to_string(),
            stderr: "Job for x.service failed.\n".to_string(),
        };
        assert_eq!(output.to_string(), "out\nJob for x.service failed.");
        assert!(CommandOutput::default().is_empty());
    }

    #[test]
    fn test_command_failed_display() {
        let err = ServiceManagerError::CommandFailed {
            command: "systemctl restart serial-vault".to_string(),
            exit_code: Some(5),
            output: CommandOutput::default(),
        };
        assert_eq!(err.to_string(), "systemctl restart serial-vault exited with code 5");
        assert!(err.output().is_some());
    }
}
