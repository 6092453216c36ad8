//! # Status Reporting
//!
//! Two-valued (state, message) status surfaced to the deployment framework.
//!
//! Implementations:
//! - `HookToolStatusReporter`: runs the framework's `status-set` tool
//! - `LogStatusReporter`: logs the status when no hook tool is available

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

/// Name of the framework tool that records unit status
pub const STATUS_SET_TOOL: &str = "status-set";

/// Workload state reported alongside a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusState {
    Active,
    Blocked,
    Maintenance,
    Waiting,
}

impl StatusState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusState::Active => "active",
            StatusState::Blocked => "blocked",
            StatusState::Maintenance => "maintenance",
            StatusState::Waiting => "waiting",
        }
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for status reports
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report(&self, state: StatusState, message: &str) -> Result<()>;
}

/// Reports through the `status-set` hook tool
#[derive(Debug, Clone)]
pub struct HookToolStatusReporter {
    tool: PathBuf,
}

impl HookToolStatusReporter {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }
}

#[async_trait]
impl StatusReporter for HookToolStatusReporter {
    async fn report(&self, state: StatusState, message: &str) -> Result<()> {
        debug!(tool = %self.tool.display(), %state, message, "Setting workload status");
        let output = Command::new(&self.tool)
            .arg(state.as_str())
            .arg(message)
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", self.tool.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} exited with {}: {}",
                self.tool.display(),
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }
}

/// Logs status reports; used outside a hook environment
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusReporter;

#[async_trait]
impl StatusReporter for LogStatusReporter {
    async fn report(&self, state: StatusState, message: &str) -> Result<()> {
        info!(%state, message, "Workload status");
        Ok(())
    }
}

/// Pick `status-set` when it is on PATH, else fall back to logging
#[must_use]
pub fn discover_status_reporter() -> Box<dyn StatusReporter> {
    match which::which(STATUS_SET_TOOL) {
        Ok(tool) => Box::new(HookToolStatusReporter::new(tool)),
        Err(_) => {
            debug!("{STATUS_SET_TOOL} not found on PATH, status will only be logged");
            Box::new(LogStatusReporter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_state_strings() {
        assert_eq!(StatusState::Active.as_str(), "active");
        assert_eq!(StatusState::Blocked.to_string(), "blocked");
    }

    #[tokio::test]
    async fn test_log_reporter_never_fails() {
        LogStatusReporter
            .report(StatusState::Active, "ready")
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hook_tool_reporter_propagates_failure() {
        let reporter = HookToolStatusReporter::new("false");
        let err = reporter
            .report(StatusState::Blocked, "error restarting service")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hook_tool_reporter_success() {
        HookToolStatusReporter::new("true")
            .report(StatusState::Active, "ready")
            .await
            .unwrap();
    }
}
