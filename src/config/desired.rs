//! # Desired Configuration
//!
//! The mapping the settings file is rendered from. It is rebuilt on every
//! invocation from the charm config, the database relation and the service
//! environment, and never persisted on its own.

use super::{ConfigError, DatabaseInfo, ServiceEnvironment};
use crate::constants::{
    SETTING_MAIN_DB, SETTING_SSO_BASE_URL, SETTING_STANDBYS, SETTING_STORE_BASE_URL,
    STAGING_ENVIRONMENT, STAGING_SSO_BASE_URL, STAGING_STORE_BASE_URL,
};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Operator-supplied charm configuration
pub type CharmConfig = BTreeMap<String, Value>;

/// Setting name to value, sorted so rendering is deterministic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredConfig(BTreeMap<String, Value>);

impl DesiredConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble the desired settings for this invocation
    ///
    /// - every charm config entry is carried over
    /// - `maindb` is the primary URI
    /// - `standbys_urls` is added only when there is at least one standby
    /// - the staging SSO and store URLs are added only when
    ///   `SERVICE_ENVIRONMENT` is `staging`
    #[must_use]
    pub fn build(
        charm_config: &CharmConfig,
        database: &DatabaseInfo,
        environment: &ServiceEnvironment,
    ) -> Self {
        let mut desired = Self(charm_config.clone());
        desired.insert(SETTING_MAIN_DB, database.primary.as_str());

        if !database.standbys.is_empty() {
            let standbys = database
                .standbys
                .iter()
                .map(|uri| Value::String(uri.clone()))
                .collect::<Vec<_>>();
            desired.insert(SETTING_STANDBYS, Value::Sequence(standbys));
        }

        if environment.deployment_environment() == Some(STAGING_ENVIRONMENT) {
            desired.insert(SETTING_SSO_BASE_URL, STAGING_SSO_BASE_URL);
            desired.insert(SETTING_STORE_BASE_URL, STAGING_STORE_BASE_URL);
        }

        desired
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for DesiredConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Load the charm config mapping from a YAML file
///
/// An empty file is an empty config; anything but a mapping is rejected.
pub fn load_charm_config(path: &Path) -> Result<CharmConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Null => Ok(CharmConfig::new()),
        Value::Mapping(_) => {
            serde_yaml::from_value(value).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => Err(ConfigError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn database(standbys: &[&str]) -> DatabaseInfo {
        DatabaseInfo::new(
            "postgresql://vault:pw@db-0/vault",
            standbys.iter().map(ToString::to_string).collect(),
        )
        .unwrap()
    }

    fn charm_config() -> CharmConfig {
        [
            ("title".to_string(), Value::from("Serial Vault")),
            ("keystore".to_string(), Value::from("database")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_build_carries_charm_config_and_primary() {
        let desired = DesiredConfig::build(
            &charm_config(),
            &database(&[]),
            &ServiceEnvironment::new(),
        );
        assert_eq!(desired.get("title"), Some(&Value::from("Serial Vault")));
        assert_eq!(
            desired.get(SETTING_MAIN_DB),
            Some(&Value::from("postgresql://vault:pw@db-0/vault"))
        );
    }

    #[test]
    fn test_build_omits_empty_standbys() {
        let desired = DesiredConfig::build(
            &charm_config(),
            &database(&[]),
            &ServiceEnvironment::new(),
        );
        assert!(!desired.contains_key(SETTING_STANDBYS));
    }

    #[test]
    fn test_build_includes_standbys_verbatim() {
        let standbys = ["postgresql://vault:pw@db-1/vault", "postgresql://vault:pw@db-2/vault"];
        let desired = DesiredConfig::build(
            &charm_config(),
            &database(&standbys),
            &ServiceEnvironment::new(),
        );
        let expected = Value::Sequence(standbys.iter().map(|s| Value::from(*s)).collect());
        assert_eq!(desired.get(SETTING_STANDBYS), Some(&expected));
    }

    #[test]
    fn test_build_staging_overrides() {
        let env: ServiceEnvironment = [("SERVICE_ENVIRONMENT", "staging")].into_iter().collect();
        let desired = DesiredConfig::build(&charm_config(), &database(&[]), &env);
        assert_eq!(
            desired.get(SETTING_SSO_BASE_URL),
            Some(&Value::from(STAGING_SSO_BASE_URL))
        );
        assert_eq!(
            desired.get(SETTING_STORE_BASE_URL),
            Some(&Value::from(STAGING_STORE_BASE_URL))
        );
    }

    #[test]
    fn test_build_no_overrides_outside_staging() {
        for name in ["production", "Staging", ""] {
            let env: ServiceEnvironment = [("SERVICE_ENVIRONMENT", name)].into_iter().collect();
            let desired = DesiredConfig::build(&charm_config(), &database(&[]), &env);
            assert!(!desired.contains_key(SETTING_SSO_BASE_URL), "env {name:?}");
            assert!(!desired.contains_key(SETTING_STORE_BASE_URL), "env {name:?}");
        }
    }

    #[test]
    fn test_load_charm_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "title: Serial Vault\nenableUserAuth: true").unwrap();
        let config = load_charm_config(file.path()).unwrap();
        assert_eq!(config.get("enableUserAuth"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_load_charm_config_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(load_charm_config(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_load_charm_config_rejects_sequence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "- a\n- b").unwrap();
        assert!(matches!(
            load_charm_config(file.path()),
            Err(ConfigError::NotAMapping { .. })
        ));
    }
}
