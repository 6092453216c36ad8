//! # Configuration
//!
//! Hook settings plus the inputs the desired state is assembled from.
//!
//! - `hook`: hook-level settings from environment variables
//! - `desired`: the `DesiredConfig` mapping and its builder
//! - `database`: primary/standby connection info
//! - `environment`: service environment variables

pub mod database;
pub mod desired;
pub mod environment;
pub mod hook;

pub use database::DatabaseInfo;
pub use desired::{load_charm_config, CharmConfig, DesiredConfig};
pub use environment::ServiceEnvironment;
pub use hook::{HookConfig, ServiceLayout};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading hook inputs
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Expected a mapping at the top level of {path}")]
    NotAMapping { path: PathBuf },
    #[error("Failed to parse environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("Invalid database URI '{uri}': expected postgres:// or postgresql:// scheme")]
    InvalidDatabaseUri { uri: String },
}
