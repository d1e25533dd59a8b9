//! Secrets loaded from secrets.yaml

use crate::error::{ConfigError, ConfigResult};
use crate::section::scalar_to_string;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Secrets store loaded from secrets.yaml
///
/// Scalar values are kept as strings so `!secret` can be used for numeric
/// settings such as a port or a PIN.
#[derive(Debug, Clone)]
pub struct Secrets {
    secrets: HashMap<String, String>,
    path: PathBuf,
}

impl Secrets {
    /// Load `secrets.yaml` from the config directory; a missing file is empty
    pub fn load(config_dir: &Path) -> ConfigResult<Self> {
        let path = config_dir.join("secrets.yaml");

        if !path.exists() {
            debug!("No secrets.yaml found at {:?}, using empty secrets", path);
            return Ok(Self {
                secrets: HashMap::new(),
                path,
            });
        }

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::read(&path, e))?;
        let raw: HashMap<String, serde_yaml::Value> =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::yaml(&path, e))?;

        let secrets: HashMap<String, String> = raw
            .into_iter()
            .map(|(key, value)| {
                let value = scalar_to_string(&value).unwrap_or_else(|| {
                    serde_yaml::to_string(&value)
                        .unwrap_or_default()
                        .trim()
                        .to_string()
                });
                (key, value)
            })
            .collect();

        debug!("Loaded {} secrets from {:?}", secrets.len(), path);

        Ok(Self { secrets, path })
    }

    pub fn get(&self, key: &str) -> ConfigResult<&str> {
        self.secrets
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::SecretNotFound {
                key: key.to_string(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.secrets.contains_key(key)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl Default for Secrets {
    fn default() -> Self {
        Self {
            secrets: HashMap::new(),
            path: PathBuf::from("secrets.yaml"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_secrets_as_strings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("secrets.yaml"),
            "serial_port: /dev/ttyUSB0\napi_key: 6f3a\npin: 1234\nenabled: true\n",
        )
        .unwrap();

        let secrets = Secrets::load(dir.path()).unwrap();
        assert_eq!(secrets.get("serial_port").unwrap(), "/dev/ttyUSB0");
        assert_eq!(secrets.get("api_key").unwrap(), "6f3a");
        assert_eq!(secrets.get("pin").unwrap(), "1234");
        assert_eq!(secrets.get("enabled").unwrap(), "true");
        assert_eq!(secrets.len(), 4);
    }

    #[test]
    fn test_missing_secret() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("secrets.yaml"), "key: value\n").unwrap();

        let secrets = Secrets::load(dir.path()).unwrap();
        assert!(matches!(
            secrets.get("nonexistent"),
            Err(ConfigError::SecretNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let secrets = Secrets::load(dir.path()).unwrap();
        assert!(secrets.is_empty());
        assert!(!secrets.contains("anything"));
    }
}
