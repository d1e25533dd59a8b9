//! Boundary to the stick driver
//!
//! The driver owns the serial line, the radio protocol and the JSON state
//! file. This crate only drives it through [`DuofernDriver`].

use crate::config::StickConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Command asking a device to report its current status
pub const GET_STATUS: &str = "getStatus";

#[derive(Debug, Clone, Error)]
pub enum DriverError {
    #[error("stick communication failed: {0}")]
    Communication(String),

    #[error("invalid stick configuration: {0}")]
    Config(String),

    #[error("command rejected by stick: {0}")]
    Rejected(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Hex device identifier as used by the stick (e.g. `"40a1b2"`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceCode(String);

impl DeviceCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for DeviceCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

/// A device known to the stick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceModule {
    pub code: DeviceCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Last reported readings, keyed by reading name
    #[serde(default)]
    pub state: Map<String, Value>,
}

impl DeviceModule {
    pub fn new(code: impl Into<DeviceCode>) -> Self {
        Self {
            code: code.into(),
            name: None,
            state: Map::new(),
        }
    }
}

/// Point-in-time copy of every device the stick knows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModulesSnapshot {
    pub by_code: BTreeMap<DeviceCode, DeviceModule>,
}

impl ModulesSnapshot {
    pub fn codes(&self) -> Vec<&DeviceCode> {
        self.by_code.keys().collect()
    }

    pub fn contains(&self, code: &DeviceCode) -> bool {
        self.by_code.contains_key(code)
    }
}

impl FromIterator<DeviceModule> for ModulesSnapshot {
    fn from_iter<I: IntoIterator<Item = DeviceModule>>(iter: I) -> Self {
        Self {
            by_code: iter.into_iter().map(|m| (m.code.clone(), m)).collect(),
        }
    }
}

/// A change reported by the stick
///
/// Every field is optional; updates without a device id carry no target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceUpdate {
    pub device_id: Option<String>,
    pub key: Option<String>,
    pub value: Option<Value>,
}

impl DeviceUpdate {
    pub fn for_device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..Default::default()
        }
    }

    pub fn with_reading(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self.value = Some(value.into());
        self
    }
}

/// Callback the driver invokes for every device update
pub type UpdatesCallback = Arc<dyn Fn(DeviceUpdate) + Send + Sync>;

/// Operations the integration needs from a stick driver
///
/// Calls may block on serial I/O; the integration never invokes them from
/// an async task directly.
pub trait DuofernDriver: Send + Sync {
    /// Open the serial line and start the receive loop
    fn start(&self) -> DriverResult<()>;

    fn pair(&self, timeout: Duration) -> DriverResult<()>;

    fn unpair(&self, timeout: Duration) -> DriverResult<()>;

    /// Ask every paired device for its status
    fn sync_devices(&self) -> DriverResult<()>;

    /// Drop unpaired devices from the stick's state file
    fn clean_config(&self) -> DriverResult<()>;

    fn send_command(&self, device: &DeviceCode, command: &str) -> DriverResult<()>;

    fn modules_snapshot(&self) -> ModulesSnapshot;

    fn lookup_device(&self, device: &DeviceCode) -> Option<DeviceModule> {
        self.modules_snapshot().by_code.remove(device)
    }

    fn add_updates_callback(&self, callback: UpdatesCallback);
}

/// Builds a driver for a resolved stick configuration
pub trait DriverFactory: Send + Sync {
    fn create(&self, config: &StickConfig) -> DriverResult<Arc<dyn DuofernDriver>>;
}

impl<F> DriverFactory for F
where
    F: Fn(&StickConfig) -> DriverResult<Arc<dyn DuofernDriver>> + Send + Sync,
{
    fn create(&self, config: &StickConfig) -> DriverResult<Arc<dyn DuofernDriver>> {
        self(config)
    }
}
