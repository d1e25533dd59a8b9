use crate::driver::DriverError;
use ha_config::ConfigError;
use ha_config_entries::StorageError;
use ha_service_registry::ServiceError;
use thiserror::Error;

/// Errors raised while setting the integration up
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no config entry and no duofern section in configuration.yaml")]
    NotConfigured,

    #[error("config entry {entry_id} is missing '{key}'")]
    MissingEntryKey { entry_id: String, key: String },

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("service registration failed: {0}")]
    Service(#[from] ServiceError),
}

pub type SetupResult<T> = Result<T, SetupError>;

/// Errors raised while loading the host from a config directory
#[derive(Debug, Error)]
pub enum HostError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type HostResult<T> = Result<T, HostError>;
