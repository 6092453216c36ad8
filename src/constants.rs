//! # Constants
//!
//! Shared constants used throughout the reconciler.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default managed service (and systemd unit) name
pub const DEFAULT_SERVICE_NAME: &str = "serial-vault";

/// Default root under which each service gets `/srv/<name>`
pub const DEFAULT_SERVICE_BASE_DIR: &str = "/srv";

/// Default directory for locally administered systemd units
pub const DEFAULT_SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";

/// Default user the service runs as
pub const DEFAULT_SERVICE_USER: &str = "www-data";

/// Default location of the persisted flag store
pub const DEFAULT_STATE_FILE: &str = "/var/lib/service-reconciler/flags.json";

/// Event fired periodically by the framework; never reconciles
pub const DEFAULT_STATUS_POLL_EVENT: &str = "update-status";

/// Flag set once the service has been configured and restarted successfully
pub const FLAG_SERVICE_CONFIGURED: &str = "service.configured";

/// Flag held between a detected change and a successful restart
pub const FLAG_RESTART_PENDING: &str = "service.restart-pending";

/// Flag held between a unit file change and a successful daemon-reload
pub const FLAG_RELOAD_PENDING: &str = "service.reload-pending";

/// Flag set by the base layer once the service code is installed
pub const FLAG_BASE_CONFIGURED: &str = "ols.configured";

/// Flag set while a primary database connection is available
pub const FLAG_DB_MASTER_AVAILABLE: &str = "db.master.available";

/// Environment variable selecting the deployment environment
pub const SERVICE_ENVIRONMENT_VAR: &str = "SERVICE_ENVIRONMENT";

/// Deployment environment that enables the staging URL overrides
pub const STAGING_ENVIRONMENT: &str = "staging";

/// Staging identity service base URL
pub const STAGING_SSO_BASE_URL: &str = "https://login.staging.ubuntu.com/api/v2/";

/// Staging store base URL
pub const STAGING_STORE_BASE_URL: &str = "https://dashboard.staging.snapcraft.io/dev/api";

/// Settings keys written by the desired-config builder
pub const SETTING_MAIN_DB: &str = "maindb";
pub const SETTING_STANDBYS: &str = "standbys_urls";
pub const SETTING_SSO_BASE_URL: &str = "ssoBaseURL";
pub const SETTING_STORE_BASE_URL: &str = "storeBaseURL";

/// File name of the rendered settings file inside `<base>/etc`
pub const SETTINGS_FILE_NAME: &str = "settings.yaml";

/// Mode of the rendered systemd unit
pub const DESCRIPTOR_FILE_MODE: u32 = 0o644;

/// Mode of the rendered settings file (holds database credentials)
pub const SETTINGS_FILE_MODE: u32 = 0o640;

/// Status messages reported to the framework
pub const STATUS_READY_MESSAGE: &str = "ready";
pub const STATUS_RESTART_ERROR_MESSAGE: &str = "error restarting service";
