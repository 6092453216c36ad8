//! # systemctl
//!
//! `ServiceManager` backed by the `systemctl` binary.

use super::{CommandOutput, ServiceManager, ServiceManagerError};
use crate::observability::metrics;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::{debug, info};

const SYSTEMCTL: &str = "systemctl";

/// Characters systemd accepts in unit names
static UNIT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9:_.\\@-]+$").expect("unit name pattern is valid")
});

#[derive(Debug, Clone)]
pub struct SystemctlManager {
    systemctl: PathBuf,
}

impl SystemctlManager {
    pub fn new(systemctl: impl Into<PathBuf>) -> Self {
        Self {
            systemctl: systemctl.into(),
        }
    }

    /// Use the configured binary, or find `systemctl` on PATH
    pub fn discover(configured: Option<&Path>) -> Result<Self, ServiceManagerError> {
        if let Some(path) = configured {
            return Ok(Self::new(path));
        }
        which::which(SYSTEMCTL)
            .map(Self::new)
            .map_err(|e| ServiceManagerError::NotFound(format!("{SYSTEMCTL}: {e}")))
    }

    async fn run(&self, label: &str, args: &[&str]) -> Result<(), ServiceManagerError> {
        let command = format!("{} {}", self.systemctl.display(), args.join(" "));
        debug!(%command, "Running service manager command");
        metrics::increment_service_commands(label);

        let output = Command::new(&self.systemctl)
            .args(args)
            .output()
            .await
            .map_err(|source| {
                metrics::increment_service_command_errors(label);
                ServiceManagerError::Spawn {
                    command: command.clone(),
                    source,
                }
            })?;

        if !output.status.success() {
            metrics::increment_service_command_errors(label);
            return Err(ServiceManagerError::CommandFailed {
                command,
                exit_code: output.status.code(),
                output: CommandOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                },
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceManager for SystemctlManager {
    async fn daemon_reload(&self) -> Result<(), ServiceManagerError> {
        self.run("daemon-reload", &["daemon-reload"]).await?;
        info!("Reloaded systemd unit definitions");
        Ok(())
    }

    async fn restart(&self, unit: &str) -> Result<(), ServiceManagerError> {
        if !UNIT_NAME.is_match(unit) {
            return Err(ServiceManagerError::InvalidUnitName(unit.to_string()));
        }
        self.run("restart", &["restart", unit]).await?;
        info!(unit, "Restarted service");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_name_pattern() {
        assert!(UNIT_NAME.is_match("serial-vault"));
        assert!(UNIT_NAME.is_match("serial-vault.service"));
        assert!(UNIT_NAME.is_match("getty@tty1"));
        assert!(!UNIT_NAME.is_match("serial vault"));
        assert!(!UNIT_NAME.is_match("vault;reboot"));
        assert!(!UNIT_NAME.is_match(""));
    }

    #[tokio::test]
    async fn test_restart_rejects_invalid_unit_without_running() {
        let manager = SystemctlManager::new("/nonexistent/systemctl");
        let err = manager.restart("bad unit").await.unwrap_err();
        assert!(matches!(err, ServiceManagerError::InvalidUnitName(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let manager = SystemctlManager::new("/nonexistent/systemctl");
        let err = manager.restart("serial-vault").await.unwrap_err();
        assert!(matches!(err, ServiceManagerError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_captures_output() {
        // `sh restart serial-vault` fails to open a script named "restart"
        let manager = SystemctlManager::new("sh");
        let err = manager.restart("serial-vault").await.unwrap_err();
        match err {
            ServiceManagerError::CommandFailed {
                exit_code, output, ..
            } => {
                assert!(matches!(exit_code, Some(code) if code != 0));
                assert!(output.stderr.contains("restart"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_discover_prefers_configured_path() {
        let manager = SystemctlManager::discover(Some(Path::new("/opt/bin/systemctl"))).unwrap();
        assert_eq!(manager.systemctl, PathBuf::from("/opt/bin/systemctl"));
    }
}
