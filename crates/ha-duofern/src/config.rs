//! Stick configuration resolution
//!
//! The first config entry of the `duofern` domain wins. Without one, the
//! legacy `duofern:` section of configuration.yaml is used, with per-key
//! fallbacks.

use crate::constants::{
    CONF_CODE, CONF_CONFIG_FILE, CONF_SERIAL_PORT, DEFAULT_CODE, DEFAULT_CONFIG_FILE_NAME,
    DEFAULT_SERIAL_PORT, DOMAIN, LEGACY_FALLBACK_CODE,
};
use crate::error::{SetupError, SetupResult};
use ha_config::{integration_config, scalar_to_string, to_json, Value};
use ha_config_entries::{ConfigEntries, ConfigEntry};
use jsonschema::JSONSchema;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything the driver needs to open the stick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickConfig {
    pub serial_port: String,
    /// Four hex digit system code the stick pairs under
    pub system_code: String,
    /// JSON file the driver keeps its device list in
    pub config_file: PathBuf,
    /// Keep the device list in memory only
    pub ephemeral: bool,
}

/// Resolve the stick configuration, config entry first
pub fn resolve_stick_config(
    entries: &ConfigEntries,
    root: &Value,
    config_dir: &Path,
) -> SetupResult<StickConfig> {
    if let Some(entry) = entries.get_by_domain(DOMAIN).into_iter().next() {
        info!(entry_id = %entry.entry_id, "Using duofern config entry");
        return from_config_entry(&entry);
    }

    debug!("No duofern config entry, falling back to configuration.yaml");
    from_yaml(root, config_dir)
}

/// Read a config entry; all three keys are mandatory
pub fn from_config_entry(entry: &ConfigEntry) -> SetupResult<StickConfig> {
    let get = |key: &str| -> SetupResult<String> {
        let value = entry
            .data
            .get(key)
            .ok_or_else(|| SetupError::MissingEntryKey {
                entry_id: entry.entry_id.clone(),
                key: key.to_string(),
            })?;

        match value {
            serde_json::Value::String(s) => Ok(s.clone()),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            other => Err(SetupError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a string, got {}", other),
            }),
        }
    };

    Ok(StickConfig {
        serial_port: get(CONF_SERIAL_PORT)?,
        system_code: get(CONF_CODE)?,
        config_file: PathBuf::from(get(CONF_CONFIG_FILE)?),
        ephemeral: false,
    })
}

/// Read the legacy `duofern:` section of configuration.yaml
///
/// A missing `serial_port` falls back to the stick's usual by-id path, a
/// missing `code` to `affe`, and a missing `config_file` to
/// `<config_dir>/duofern.json`.
pub fn from_yaml(root: &Value, config_dir: &Path) -> SetupResult<StickConfig> {
    let section = integration_config(root, DOMAIN).ok_or(SetupError::NotConfigured)?;
    validate_section(section)?;

    let serial_port =
        section_string(section, CONF_SERIAL_PORT)?.unwrap_or_else(|| DEFAULT_SERIAL_PORT.into());
    let system_code =
        section_string(section, CONF_CODE)?.unwrap_or_else(|| LEGACY_FALLBACK_CODE.into());
    let config_file = section_string(section, CONF_CONFIG_FILE)?
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir.join(DEFAULT_CONFIG_FILE_NAME));

    Ok(StickConfig {
        serial_port,
        system_code,
        config_file,
        ephemeral: false,
    })
}

/// JSON schema of the `duofern:` section
///
/// Defaults are descriptive only; they are not filled into the section.
/// Null values are accepted and treated like missing keys.
pub fn config_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "serial_port": {"type": ["string", "null"], "default": DEFAULT_SERIAL_PORT},
            "config_file": {"type": ["string", "null"]},
            "code": {"type": ["string", "integer", "null"], "default": DEFAULT_CODE}
        }
    })
}

fn validate_section(section: &Value) -> SetupResult<()> {
    let schema = config_schema();
    let compiled = JSONSchema::compile(&schema).map_err(|e| SetupError::InvalidValue {
        key: DOMAIN.to_string(),
        reason: e.to_string(),
    })?;

    let instance = to_json(section);
    if let Err(errors) = compiled.validate(&instance) {
        let reason = errors
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SetupError::InvalidValue {
            key: DOMAIN.to_string(),
            reason,
        });
    }
    Ok(())
}

fn section_string(section: &Value, key: &str) -> SetupResult<Option<String>> {
    match section.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_to_string(value)
            .map(Some)
            .ok_or_else(|| SetupError::InvalidValue {
                key: key.to_string(),
                reason: "expected a scalar".to_string(),
            }),
    }
}
