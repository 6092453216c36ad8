//! # Service Environment
//!
//! Environment variables handed to the managed service. They are rendered into
//! the unit as `Environment=` lines, and `SERVICE_ENVIRONMENT` also selects the
//! staging URL overrides of the settings file.

use super::ConfigError;
use crate::constants::SERVICE_ENVIRONMENT_VAR;
use std::collections::BTreeMap;
use std::path::Path;

/// Sorted environment variables of the managed service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceEnvironment {
    vars: BTreeMap<String, String>,
}

impl ServiceEnvironment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a dotenv file
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let iter = dotenvy::from_path_iter(path).map_err(|source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut vars = BTreeMap::new();
        for item in iter {
            let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                path: path.to_path_buf(),
                source,
            })?;
            vars.insert(key, value);
        }
        Ok(Self { vars })
    }

    /// Take `SERVICE_ENVIRONMENT` from the hook's own process environment
    #[must_use]
    pub fn from_process() -> Self {
        let mut env = Self::new();
        if let Ok(value) = std::env::var(SERVICE_ENVIRONMENT_VAR) {
            env.set(SERVICE_ENVIRONMENT_VAR, value);
        }
        env
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Deployment environment name (`SERVICE_ENVIRONMENT`), if any
    #[must_use]
    pub fn deployment_environment(&self) -> Option<&str> {
        self.get(SERVICE_ENVIRONMENT_VAR)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ServiceEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "SERVICE_ENVIRONMENT=staging").unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "SENTRY_DSN=\"https://key@sentry.example/1\"").unwrap();

        let env = ServiceEnvironment::from_env_file(file.path()).unwrap();
        assert_eq!(env.deployment_environment(), Some("staging"));
        assert_eq!(env.get("SENTRY_DSN"), Some("https://key@sentry.example/1"));
    }

    #[test]
    fn test_from_env_file_missing() {
        let result = ServiceEnvironment::from_env_file(Path::new("/nonexistent/service.env"));
        assert!(matches!(result, Err(ConfigError::EnvFile { .. })));
    }

    #[test]
    fn test_iter_is_sorted() {
        let env: ServiceEnvironment = [("B", "2"), ("A", "1")].into_iter().collect();
        let keys: Vec<&str> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "B"]);
    }
}
