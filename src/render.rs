//! # Rendering
//!
//! Turns desired state into artifact content. Both renderers are pure and
//! deterministic: the same input always yields byte-identical output, which is
//! what makes the write-with-diff comparison meaningful.

use crate::config::{DesiredConfig, ServiceEnvironment};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

const MANAGED_HEADER: &str = "# Managed by service-reconciler; local changes will be overwritten.";

/// Names systemd accepts for `Environment=` assignments
static ENV_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("environment key pattern is valid")
});

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to serialize settings: {0}")]
    Settings(#[from] serde_yaml::Error),
    #[error("Invalid environment variable name '{0}'")]
    InvalidEnvironmentKey(String),
    /// Value would break out of its unit file line; the value itself is not
    /// included since it may be a credential
    #[error("Environment variable {key} contains control characters")]
    InvalidEnvironmentValue { key: String },
}

/// How the service process is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub description: String,
    pub exec_path: PathBuf,
    pub exec_args: Vec<String>,
    pub user: String,
    pub working_dir: PathBuf,
    pub environment: ServiceEnvironment,
}

impl ServiceDescriptor {
    /// Full command line for `ExecStart=`
    #[must_use]
    pub fn exec_start(&self) -> String {
        std::iter::once(self.exec_path.display().to_string())
            .chain(self.exec_args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Render the systemd unit for the service
///
/// Environment keys must be plain identifiers and values must not contain
/// control characters; anything else is rejected rather than written.
pub fn render_service_descriptor(descriptor: &ServiceDescriptor) -> Result<String, RenderError> {
    let mut lines = vec![
        MANAGED_HEADER.to_string(),
        "[Unit]".to_string(),
        format!("Description={}", descriptor.description),
        "After=network.target".to_string(),
        String::new(),
        "[Service]".to_string(),
        "Type=simple".to_string(),
        format!("User={}", descriptor.user),
        format!("WorkingDirectory={}", descriptor.working_dir.display()),
    ];
    for (key, value) in descriptor.environment.iter() {
        lines.push(environment_line(key, value)?);
    }
    lines.extend([
        format!("ExecStart={}", descriptor.exec_start()),
        "Restart=on-failure".to_string(),
        String::new(),
        "[Install]".to_string(),
        "WantedBy=multi-user.target".to_string(),
    ]);

    let mut unit = lines.join("\n");
    unit.push('\n');
    Ok(unit)
}

/// Render the YAML settings file read by the service
pub fn render_settings(desired: &DesiredConfig) -> Result<String, RenderError> {
    let body = serde_yaml::to_string(desired)?;
    Ok(format!("{MANAGED_HEADER}\n{body}"))
}

fn environment_line(key: &str, value: &str) -> Result<String, RenderError> {
    if !ENV_KEY.is_match(key) {
        return Err(RenderError::InvalidEnvironmentKey(key.to_string()));
    }
    if value.chars().any(char::is_control) {
        return Err(RenderError::InvalidEnvironmentValue {
            key: key.to_string(),
        });
    }
    Ok(format!("Environment=\"{key}={}\"", escape_unit_value(value)))
}

/// Quote-safe value for a double-quoted `Environment=` assignment
fn escape_unit_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('%', "%%")
}
