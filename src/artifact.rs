//! # Artifacts
//!
//! Rendered files the reconciler materializes on disk. Each artifact is
//! compared with what is already there and written only when the bytes differ,
//! so the reconciler can OR the results together into a single `changed` flag.
//!
//! Writes go to a temporary file in the target directory which is then renamed
//! over the target, so readers never see a half-written artifact.

use crate::observability::metrics;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to read current artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A rendered file and where it belongs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub content: String,
    pub mode: u32,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>, mode: u32) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            mode,
        }
    }

    /// Whether the file on disk differs from the rendered content
    pub fn is_stale(&self) -> Result<bool, ArtifactError> {
        let current = read_current(&self.path)?;
        Ok(current.as_deref() != Some(self.content.as_bytes()))
    }

    /// Materialize the artifact; returns true when the file changed
    pub fn apply(&self) -> Result<bool, ArtifactError> {
        write_if_changed(&self.path, &self.content, self.mode)
    }
}

/// Current bytes at `path`, `None` when the file does not exist
fn read_current(path: &Path) -> Result<Option<Vec<u8>>, ArtifactError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ArtifactError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write `content` to `path` unless the file already holds exactly these bytes
///
/// A missing file counts as changed. Content is never logged since settings
/// files carry credentials; digests are logged instead.
pub fn write_if_changed(path: &Path, content: &str, mode: u32) -> Result<bool, ArtifactError> {
    let current = read_current(path)?;

    if current.as_deref() == Some(content.as_bytes()) {
        debug!(path = %path.display(), "Artifact unchanged");
        return Ok(false);
    }

    let previous = current
        .as_deref()
        .map_or_else(|| "<missing>".to_string(), digest);
    debug!(
        path = %path.display(),
        %previous,
        next = %digest(content.as_bytes()),
        "Artifact differs from rendered content"
    );

    write_atomic(path, content.as_bytes(), mode).map_err(|source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    metrics::increment_artifacts_written();
    info!(path = %path.display(), "Artifact written");
    Ok(true)
}

/// Replace `path` with `content` via temp file and rename
pub fn write_atomic(path: &Path, content: &[u8], mode: u32) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Hex SHA-256 of artifact content
#[must_use]
pub fn digest(content: &[u8]) -> String {
    Sha256::digest(content)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
