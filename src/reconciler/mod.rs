//! # Reconciler
//!
//! Core reconciliation logic for the managed service.
//!
//! The reconciler:
//! - Skips no-op triggers (status polls, no database yet)
//! - Renders the systemd unit and the settings file from the desired state
//! - Writes each artifact only when its content changed
//! - Restarts the unit when anything changed
//! - Persists `service.configured` and reports workload status
//!
//! ## Reconciliation Flow
//!
//! 1. Skip on the status-poll event, reporting ready
//! 2. Render both artifacts (nothing is written if rendering fails)
//! 3. Diff each artifact against disk; `changed` is the OR of both
//! 4. Persist `service.reload-pending` / `service.restart-pending`, then write
//! 5. No restart pending: report ready and stop
//! 6. Otherwise: daemon-reload while a reload is pending, then restart
//!    - success: set `service.configured`, clear pending flags, report ready
//!    - failure: log command output, report blocked, propagate
//!
//! Nothing is retried here. The pending flags are persisted before any
//! artifact is written and cleared only after a successful restart, so a run
//! that fails or is interrupted anywhere after the diff leaves the next
//! invocation to reload and restart even if the artifacts already match.

mod types;

pub use types::{Outcome, ReconcilerError, Trigger};

use crate::artifact::Artifact;
use crate::config::{DesiredConfig, ServiceEnvironment, ServiceLayout};
use crate::constants::{
    DEFAULT_SERVICE_USER, DEFAULT_STATUS_POLL_EVENT, DESCRIPTOR_FILE_MODE, FLAG_RELOAD_PENDING,
    FLAG_RESTART_PENDING, FLAG_SERVICE_CONFIGURED, SETTINGS_FILE_MODE, STATUS_READY_MESSAGE,
    STATUS_RESTART_ERROR_MESSAGE,
};
use crate::observability::metrics;
use crate::render::{render_service_descriptor, render_settings, ServiceDescriptor};
use crate::service::{ServiceManager, ServiceManagerError};
use crate::state::FlagStore;
use crate::status::{StatusReporter, StatusState};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub struct Reconciler {
    layout: ServiceLayout,
    service_user: String,
    environment: ServiceEnvironment,
    status_poll_event: String,
    service_manager: Arc<dyn ServiceManager>,
    status: Arc<dyn StatusReporter>,
    flags: Arc<dyn FlagStore>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("layout", &self.layout)
            .field("service_user", &self.service_user)
            .field("status_poll_event", &self.status_poll_event)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        layout: ServiceLayout,
        service_manager: Arc<dyn ServiceManager>,
        status: Arc<dyn StatusReporter>,
        flags: Arc<dyn FlagStore>,
    ) -> Self {
        Self {
            layout,
            service_user: DEFAULT_SERVICE_USER.to_string(),
            environment: ServiceEnvironment::new(),
            status_poll_event: DEFAULT_STATUS_POLL_EVENT.to_string(),
            service_manager,
            status,
            flags,
        }
    }

    #[must_use]
    pub fn with_service_user(mut self, user: impl Into<String>) -> Self {
        self.service_user = user.into();
        self
    }

    /// Environment variables rendered into the unit
    #[must_use]
    pub fn with_environment(mut self, environment: ServiceEnvironment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_status_poll_event(mut self, event: impl Into<String>) -> Self {
        self.status_poll_event = event.into();
        self
    }

    #[must_use]
    pub fn layout(&self) -> &ServiceLayout {
        &self.layout
    }

    /// Invocation descriptor for the managed service
    #[must_use]
    pub fn service_descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor {
            description: self.layout.service_name.clone(),
            exec_path: self.layout.exec_path(),
            exec_args: vec![
                "--config".to_string(),
                self.layout.config_path.display().to_string(),
            ],
            user: self.service_user.clone(),
            working_dir: self.layout.code_dir.clone(),
            environment: self.environment.clone(),
        }
    }

    /// Render both artifacts without touching disk
    pub fn render(&self, desired: &DesiredConfig) -> Result<(Artifact, Artifact), ReconcilerError> {
        let descriptor = Artifact::new(
            &self.layout.unit_path,
            render_service_descriptor(&self.service_descriptor())?,
            DESCRIPTOR_FILE_MODE,
        );
        let settings = Artifact::new(
            &self.layout.config_path,
            render_settings(desired)?,
            SETTINGS_FILE_MODE,
        );
        Ok((descriptor, settings))
    }

    /// Bring the service in line with `desired`
    pub async fn reconcile(
        &self,
        trigger: &Trigger,
        desired: &DesiredConfig,
    ) -> Result<Outcome, ReconcilerError> {
        let span = info_span!(
            "reconcile",
            service = %self.layout.service_name,
            event = %trigger.event
        );
        let start = Instant::now();
        metrics::increment_reconciliations();

        let result = self.reconcile_inner(trigger, desired).instrument(span).await;

        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        match &result {
            Ok(Outcome::Applied) => metrics::increment_reconciliations_applied(),
            Ok(Outcome::Unchanged) => {}
            Err(_) => metrics::increment_reconciliation_errors(),
        }
        result
    }

    async fn reconcile_inner(
        &self,
        trigger: &Trigger,
        desired: &DesiredConfig,
    ) -> Result<Outcome, ReconcilerError> {
        if trigger.event == self.status_poll_event {
            debug!("Status poll event, skipping reconciliation");
            metrics::increment_reconciliations_skipped();
            self.report(StatusState::Active, STATUS_READY_MESSAGE).await?;
            return Ok(Outcome::Unchanged);
        }

        if !trigger.database_available {
            info!("Database not available yet, skipping reconciliation");
            metrics::increment_reconciliations_skipped();
            return Ok(Outcome::Unchanged);
        }

        let (descriptor, settings) = self.render(desired)?;

        // Pending flags are persisted before anything is written, so an
        // interrupted or failed run still reloads and restarts next time
        let descriptor_changed = descriptor.is_stale()?;
        let settings_changed = settings.is_stale()?;
        let changed = descriptor_changed || settings_changed;
        if descriptor_changed {
            self.set_flag(FLAG_RELOAD_PENDING, true).await?;
        }
        if changed {
            self.set_flag(FLAG_RESTART_PENDING, true).await?;
        }

        descriptor.apply()?;
        settings.apply()?;

        if !self.get_flag(FLAG_RESTART_PENDING).await? {
            info!("Nothing changed, doing nothing");
            // other layers may have left a waiting status behind
            self.report(StatusState::Active, STATUS_READY_MESSAGE).await?;
            return Ok(Outcome::Unchanged);
        }

        if changed {
            info!(
                descriptor_changed,
                settings_changed, "Configuration changed, restarting service"
            );
        } else {
            info!("Previous restart did not complete, restarting service");
        }

        let reload_units = self.get_flag(FLAG_RELOAD_PENDING).await?;
        if let Err(e) = self.restart(reload_units).await {
            self.handle_restart_failure(&e).await;
            return Err(e.into());
        }

        self.set_flag(FLAG_SERVICE_CONFIGURED, true).await?;
        self.set_flag(FLAG_RELOAD_PENDING, false).await?;
        self.set_flag(FLAG_RESTART_PENDING, false).await?;
        self.report(StatusState::Active, STATUS_READY_MESSAGE).await?;
        info!("Service reconciled");
        Ok(Outcome::Applied)
    }

    async fn restart(&self, reload_units: bool) -> Result<(), ServiceManagerError> {
        if reload_units {
            self.service_manager.daemon_reload().await?;
        }
        self.service_manager
            .restart(&self.layout.service_name)
            .await
    }

    async fn handle_restart_failure(&self, err: &ServiceManagerError) {
        match err.output() {
            Some(output) if !output.is_empty() => {
                error!(error = %err, output = %output, "Failed to restart service");
            }
            _ => error!(error = %err, "Failed to restart service"),
        }

        if let Err(status_err) = self
            .status
            .report(StatusState::Blocked, STATUS_RESTART_ERROR_MESSAGE)
            .await
        {
            warn!(error = %status_err, "Failed to report blocked status");
        }
    }

    async fn get_flag(&self, name: &str) -> Result<bool, ReconcilerError> {
        self.flags
            .get(name)
            .await
            .map_err(ReconcilerError::FlagStore)
    }

    async fn set_flag(&self, name: &str, value: bool) -> Result<(), ReconcilerError> {
        self.flags
            .set(name, value)
            .await
            .map_err(ReconcilerError::FlagStore)
    }

    async fn report(&self, state: StatusState, message: &str) -> Result<(), ReconcilerError> {
        self.status
            .report(state, message)
            .await
            .map_err(ReconcilerError::Status)
    }
}
