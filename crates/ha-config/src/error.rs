//! Errors raised while loading configuration.yaml and the files it pulls in

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `!secret` names a key missing from secrets.yaml
    #[error("secret '{key}' not found in secrets.yaml")]
    SecretNotFound { key: String },

    /// `!env_var` names an unset variable
    #[error("environment variable '{var}' not set")]
    EnvVarNotFound { var: String },

    /// A tag was given something other than a string
    #[error("{tag} expects a string argument, got {found}")]
    TagArgument { tag: &'static str, found: String },

    #[error("circular include of {}", path.display())]
    CircularInclude { path: PathBuf },
}

impl ConfigError {
    pub(crate) fn read(path: &Path, source: std::io::Error) -> Self {
        ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn yaml(path: &Path, source: serde_yaml::Error) -> Self {
        ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn tag_argument(tag: &'static str, found: &serde_yaml::Value) -> Self {
        ConfigError::TagArgument {
            tag,
            found: format!("{:?}", found),
        }
    }
}
