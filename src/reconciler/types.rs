//! # Types
//!
//! Core types for the reconciler.

use crate::artifact::ArtifactError;
use crate::render::RenderError;
use crate::service::ServiceManagerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Failed to render artifacts: {0}")]
    Render(#[from] RenderError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("Service manager command failed: {0}")]
    ServiceManager(#[from] ServiceManagerError),
    #[error("Failed to persist flag: {0}")]
    FlagStore(#[source] anyhow::Error),
    #[error("Failed to report status: {0}")]
    Status(#[source] anyhow::Error),
}

/// What a reconcile call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Materialized state already matched; nothing was restarted
    Unchanged,
    /// Artifacts were rewritten and the service restarted
    Applied,
}

impl Outcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Unchanged => "unchanged",
            Outcome::Applied => "applied",
        }
    }
}

/// The event a reconcile call reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Framework event name, e.g. `config-changed` or `update-status`
    pub event: String,
    /// Whether a primary database connection is available
    pub database_available: bool,
}

impl Trigger {
    pub fn new(event: impl Into<String>, database_available: bool) -> Self {
        Self {
            event: event.into(),
            database_available,
        }
    }
}
