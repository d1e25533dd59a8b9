//! Rademacher DuoFern integration
//!
//! Connects a DuoFern USB stick driver to the host: the stick is configured
//! from a config entry or the `duofern:` section of configuration.yaml,
//! services under the `duofern` domain are forwarded to the driver, device
//! updates refresh the matching entities, and stick communication starts
//! once the host fires `homeassistant_started`.
//!
//! The radio protocol and serial I/O live behind [`DuofernDriver`].
//!
//! # Example
//!
//! ```ignore
//! use ha_duofern::{setup, HomeAssistant};
//!
//! let hass = HomeAssistant::load("/config").await?;
//! let integration = setup(&hass, &|config: &StickConfig| my_driver::open(config))?;
//! hass.start();
//! ```

mod callbacks;
mod config;
mod constants;
mod context;
mod discovery;
mod driver;
mod entity;
mod error;
mod hass;
mod services;
mod setup;

pub use callbacks::{StartupHook, UpdateCallback, UpdateOutcome};
pub use config::{config_schema, from_config_entry, from_yaml, resolve_stick_config, StickConfig};
pub use constants::*;
pub use context::DuofernContext;
pub use discovery::PlatformLoader;
pub use driver::{
    DeviceCode, DeviceModule, DeviceUpdate, DriverError, DriverFactory, DriverResult,
    DuofernDriver, ModulesSnapshot, UpdatesCallback, GET_STATUS,
};
pub use entity::{DeviceRegistry, DuofernEntity, RefreshError};
pub use error::{HostError, HostResult, SetupError, SetupResult};
pub use hass::{HomeAssistant, CONFIGURATION_FILE};
pub use services::{extract_device_code, register_services, DuofernService, ServiceHandlers};
pub use setup::{setup, setup_entry, DuofernIntegration};
