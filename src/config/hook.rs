//! # Hook Configuration
//!
//! Hook-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_SERVICE_BASE_DIR, DEFAULT_SERVICE_NAME, DEFAULT_SERVICE_USER, DEFAULT_STATE_FILE,
    DEFAULT_STATUS_POLL_EVENT, DEFAULT_SYSTEMD_UNIT_DIR, SETTINGS_FILE_NAME,
};
use std::path::PathBuf;

/// Hook-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Command-line flags of the binary take precedence over both.
#[derive(Debug, Clone)]
pub struct HookConfig {
    /// Managed service name, also used as the systemd unit name
    pub service_name: String,
    /// Root directory holding `/<service_name>` trees
    pub service_base_dir: PathBuf,
    /// Directory the systemd unit is written to
    pub systemd_unit_dir: PathBuf,
    /// User the service process runs as
    pub service_user: String,
    /// JSON file backing the persisted flags
    pub state_file: PathBuf,
    /// Event name that must never reconcile
    pub status_poll_event: String,
    /// Explicit systemctl binary; resolved on PATH when unset
    pub systemctl_path: Option<PathBuf>,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Prometheus textfile written after each invocation, if set
    pub metrics_textfile: Option<PathBuf>,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_base_dir: PathBuf::from(DEFAULT_SERVICE_BASE_DIR),
            systemd_unit_dir: PathBuf::from(DEFAULT_SYSTEMD_UNIT_DIR),
            service_user: DEFAULT_SERVICE_USER.to_string(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            status_poll_event: DEFAULT_STATUS_POLL_EVENT.to_string(),
            systemctl_path: None,
            log_level: "INFO".to_string(),
            log_format: "text".to_string(),
            metrics_textfile: None,
        }
    }
}

impl HookConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            service_name: env_var_or_default_str("SERVICE_NAME", DEFAULT_SERVICE_NAME),
            service_base_dir: PathBuf::from(env_var_or_default_str(
                "SERVICE_BASE_DIR",
                DEFAULT_SERVICE_BASE_DIR,
            )),
            systemd_unit_dir: PathBuf::from(env_var_or_default_str(
                "SYSTEMD_UNIT_DIR",
                DEFAULT_SYSTEMD_UNIT_DIR,
            )),
            service_user: env_var_or_default_str("SERVICE_USER", DEFAULT_SERVICE_USER),
            state_file: PathBuf::from(env_var_or_default_str("STATE_FILE", DEFAULT_STATE_FILE)),
            status_poll_event: env_var_or_default_str(
                "STATUS_POLL_EVENT",
                DEFAULT_STATUS_POLL_EVENT,
            ),
            systemctl_path: env_var_path("SYSTEMCTL_PATH"),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "text"),
            metrics_textfile: env_var_path("METRICS_TEXTFILE"),
        }
    }

    /// Resolve the on-disk layout of the managed service
    #[must_use]
    pub fn layout(&self) -> ServiceLayout {
        ServiceLayout::new(
            &self.service_name,
            &self.service_base_dir,
            &self.systemd_unit_dir,
        )
    }
}

/// Paths derived from the service naming convention
///
/// ```text
/// <base>/<name>/code/current/<name>      executable
/// <base>/<name>/etc/settings.yaml        settings file
/// <unit_dir>/<name>.service              systemd unit
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLayout {
    pub service_name: String,
    pub code_dir: PathBuf,
    pub config_path: PathBuf,
    pub unit_path: PathBuf,
}

impl ServiceLayout {
    pub fn new(
        service_name: &str,
        base_dir: impl Into<PathBuf>,
        unit_dir: impl Into<PathBuf>,
    ) -> Self {
        let service_dir = base_dir.into().join(service_name);
        Self {
            service_name: service_name.to_string(),
            code_dir: service_dir.join("code").join("current"),
            config_path: service_dir.join("etc").join(SETTINGS_FILE_NAME),
            unit_path: unit_dir.into().join(format!("{service_name}.service")),
        }
    }

    /// Executable started by the unit
    #[must_use]
    pub fn exec_path(&self) -> PathBuf {
        self.code_dir.join(&self.service_name)
    }
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a non-empty environment variable as a path
fn env_var_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_follows_naming_convention() {
        let layout = ServiceLayout::new("serial-vault", "/srv", "/etc/systemd/system");
        assert_eq!(
            layout.code_dir,
            PathBuf::from("/srv/serial-vault/code/current")
        );
        assert_eq!(
            layout.config_path,
            PathBuf::from("/srv/serial-vault/etc/settings.yaml")
        );
        assert_eq!(
            layout.unit_path,
            PathBuf::from("/etc/systemd/system/serial-vault.service")
        );
        assert_eq!(
            layout.exec_path(),
            PathBuf::from("/srv/serial-vault/code/current/serial-vault")
        );
    }

    #[test]
    fn test_default_config() {
        let config = HookConfig::default();
        assert_eq!(config.service_name, "serial-vault");
        assert_eq!(config.status_poll_event, "update-status");
        assert!(config.systemctl_path.is_none());
        assert_eq!(config.layout().service_name, "serial-vault");
    }
}
