//! # Persisted Flags
//!
//! Named booleans that survive between hook invocations. The reconciler only
//! ever sets `service.configured`; other collaborators read it to gate their
//! own behavior.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub mod file;

pub use file::FileFlagStore;

/// Narrow get/set interface over the persisted flags
#[async_trait]
pub trait FlagStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<bool>;

    async fn set(&self, name: &str, value: bool) -> Result<()>;

    /// Names of all flags currently set
    async fn active(&self) -> Result<Vec<String>>;
}

/// Whether the service has been configured at least once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationState {
    NotConfigured,
    Configured,
}

impl ReconciliationState {
    pub async fn load(store: &dyn FlagStore) -> Result<Self> {
        let configured = store
            .get(crate::constants::FLAG_SERVICE_CONFIGURED)
            .await?;
        Ok(if configured {
            ReconciliationState::Configured
        } else {
            ReconciliationState::NotConfigured
        })
    }
}

/// Process-local flags, for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: Mutex<BTreeMap<String, bool>>,
}

impl MemoryFlagStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with flags that are already set
    #[must_use]
    pub fn with_flags<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let flags = names.into_iter().map(|n| (n.to_string(), true)).collect();
        Self {
            flags: Mutex::new(flags),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, bool>>> {
        self.flags
            .lock()
            .map_err(|e| anyhow::anyhow!("Flag store lock poisoned: {e}"))
    }
}

#[async_trait]
impl FlagStore for MemoryFlagStore {
    async fn get(&self, name: &str) -> Result<bool> {
        Ok(self.lock()?.get(name).copied().unwrap_or(false))
    }

    async fn set(&self, name: &str, value: bool) -> Result<()> {
        self.lock()?.insert(name.to_string(), value);
        Ok(())
    }

    async fn active(&self) -> Result<Vec<String>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|(_, set)| **set)
            .map(|(name, _)| name.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FLAG_SERVICE_CONFIGURED;

    #[tokio::test]
    async fn test_memory_store_defaults_to_unset() {
        let store = MemoryFlagStore::new();
        assert!(!store.get("anything").await.unwrap());
        assert_eq!(
            ReconciliationState::load(&store).await.unwrap(),
            ReconciliationState::NotConfigured
        );
    }

    #[tokio::test]
    async fn test_memory_store_set_and_list() {
        let store = MemoryFlagStore::with_flags(["ols.configured"]);
        store.set(FLAG_SERVICE_CONFIGURED, true).await.unwrap();
        store.set("db.master.available", false).await.unwrap();

        assert_eq!(
            store.active().await.unwrap(),
            vec!["ols.configured".to_string(), FLAG_SERVICE_CONFIGURED.to_string()]
        );
        assert_eq!(
            ReconciliationState::load(&store).await.unwrap(),
            ReconciliationState::Configured
        );
    }
}
