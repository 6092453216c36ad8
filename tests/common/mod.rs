//! Common test utilities for reconciler integration tests
//!
//! Provides recording fakes for the reconciler's collaborators and a
//! temporary service layout.

#![allow(dead_code, reason = "Each test binary uses a different subset")]

use async_trait::async_trait;
use service_reconciler::config::ServiceLayout;
use service_reconciler::service::{CommandOutput, ServiceManager, ServiceManagerError};
use service_reconciler::status::{StatusReporter, StatusState};
use std::sync::{Mutex, Once};
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Install a test subscriber so reconciler logs show up with `--nocapture`
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("service_reconciler=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Service manager command seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    DaemonReload,
    Restart(String),
}

/// Records every call; restarts fail while `fail_restart` is set
#[derive(Debug, Default)]
pub struct RecordingServiceManager {
    calls: Mutex<Vec<ServiceCall>>,
    fail_restart: Mutex<bool>,
}

impl RecordingServiceManager {
    pub fn failing() -> Self {
        let manager = Self::default();
        manager.set_fail_restart(true);
        manager
    }

    pub fn set_fail_restart(&self, fail: bool) {
        *self.fail_restart.lock().unwrap() = fail;
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn restarts(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ServiceCall::Restart(_)))
            .count()
    }
}

#[async_trait]
impl ServiceManager for RecordingServiceManager {
    async fn daemon_reload(&self) -> Result<(), ServiceManagerError> {
        self.calls.lock().unwrap().push(ServiceCall::DaemonReload);
        Ok(())
    }

    async fn restart(&self, unit: &str) -> Result<(), ServiceManagerError> {
        self.calls
            .lock()
            .unwrap()
            .push(ServiceCall::Restart(unit.to_string()));
        if *self.fail_restart.lock().unwrap() {
            return Err(ServiceManagerError::CommandFailed {
                command: format!("systemctl restart {unit}"),
                exit_code: Some(1),
                output: CommandOutput {
                    stdout: String::new(),
                    stderr: format!("Job for {unit}.service failed because the control process exited with error code."),
                },
            });
        }
        Ok(())
    }
}

/// Records every status report
#[derive(Debug, Default)]
pub struct RecordingStatusReporter {
    reports: Mutex<Vec<(StatusState, String)>>,
}

impl RecordingStatusReporter {
    pub fn reports(&self) -> Vec<(StatusState, String)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<(StatusState, String)> {
        self.reports().last().cloned()
    }
}

#[async_trait]
impl StatusReporter for RecordingStatusReporter {
    async fn report(&self, state: StatusState, message: &str) -> anyhow::Result<()> {
        self.reports
            .lock()
            .unwrap()
            .push((state, message.to_string()));
        Ok(())
    }
}

/// Service layout rooted in a temporary directory
pub struct TempLayout {
    pub dir: TempDir,
    pub layout: ServiceLayout,
}

impl TempLayout {
    pub fn new(service_name: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = ServiceLayout::new(
            service_name,
            dir.path().join("srv"),
            dir.path().join("systemd"),
        );
        Self { dir, layout }
    }
}
