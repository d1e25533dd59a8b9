//! YAML configuration loading for Home Assistant
//!
//! Loads `configuration.yaml` with support for the custom tags
//! integrations rely on:
//!
//! - `!include path` - Include another YAML file
//! - `!secret key` - Substitute from secrets.yaml
//! - `!env_var VAR` - Environment variable substitution
//!
//! and gives integrations access to their own top-level section.
//!
//! # Example
//!
//! ```ignore
//! use ha_config::{integration_config, load_yaml};
//!
//! let config = load_yaml("/config", "configuration.yaml")?;
//! if let Some(section) = integration_config(&config, "mqtt") {
//!     // ...
//! }
//! ```

mod error;
mod loader;
mod secrets;
mod section;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_yaml, load_yaml_string, YamlLoader};
pub use secrets::Secrets;
pub use section::{integration_config, scalar_to_string, to_json};

// Re-export serde_yaml::Value for convenience
pub use serde_yaml::Value;
