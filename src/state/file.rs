//! # File-backed Flag Store
//!
//! Flags persisted as a small JSON document, rewritten atomically on every set.

use super::FlagStore;
use crate::artifact::write_atomic;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const STATE_FILE_MODE: u32 = 0o600;

#[derive(Debug, Default, Serialize, Deserialize)]
struct FlagDocument {
    #[serde(default)]
    flags: BTreeMap<String, bool>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Flags stored in a JSON file
#[derive(Debug, Clone)]
pub struct FileFlagStore {
    path: PathBuf,
}

impl FileFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<FlagDocument> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse flag store {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FlagDocument::default()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read flag store {}", self.path.display())),
        }
    }
}

#[async_trait]
impl FlagStore for FileFlagStore {
    async fn get(&self, name: &str) -> Result<bool> {
        Ok(self.load()?.flags.get(name).copied().unwrap_or(false))
    }

    async fn set(&self, name: &str, value: bool) -> Result<()> {
        let mut document = self.load()?;
        if document.flags.get(name) == Some(&value) {
            debug!(flag = name, value, "Flag already has requested value");
            return Ok(());
        }
        document.flags.insert(name.to_string(), value);
        document.updated_at = Some(Utc::now());

        let content = serde_json::to_string_pretty(&document)?;
        write_atomic(&self.path, content.as_bytes(), STATE_FILE_MODE)
            .with_context(|| format!("Failed to write flag store {}", self.path.display()))?;
        debug!(flag = name, value, path = %self.path.display(), "Flag persisted");
        Ok(())
    }

    async fn active(&self) -> Result<Vec<String>> {
        Ok(self
            .load()?
            .flags
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect())
    }
}
