//! Stored integration setups
//!
//! An entry is what the UI or a YAML import leaves behind for one configured
//! instance of an integration, e.g. one DuoFern stick. Only the descriptive
//! part is persisted; `state` and `reason` are rebuilt on every start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntryState {
    #[default]
    NotLoaded,
    SetupInProgress,
    Loaded,
    /// The setup handler failed; see `ConfigEntry::reason`
    SetupError,
}

/// Where an entry came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntrySource {
    #[default]
    User,
    /// Created from a configuration.yaml section
    Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntryDisabledBy {
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// ULID assigned on creation
    pub entry_id: String,
    pub domain: String,
    pub title: String,

    /// Integration-specific settings, e.g. `serial_port` and `code`
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,

    #[serde(default = "first_version")]
    pub version: u32,

    /// Checked by `ConfigEntries::add` to reject a second setup of the same device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    #[serde(default)]
    pub source: ConfigEntrySource,

    #[serde(skip, default)]
    pub state: ConfigEntryState,

    #[serde(skip, default)]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_by: Option<ConfigEntryDisabledBy>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn first_version() -> u32 {
    1
}

impl ConfigEntry {
    pub fn new(domain: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            entry_id: ulid::Ulid::new().to_string(),
            domain: domain.into(),
            title: title.into(),
            data: HashMap::new(),
            version: first_version(),
            unique_id: None,
            source: ConfigEntrySource::default(),
            state: ConfigEntryState::default(),
            reason: None,
            disabled_by: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_data_value(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    pub fn with_source(mut self, source: ConfigEntrySource) -> Self {
        self.source = source;
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_by.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.state == ConfigEntryState::Loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_entry_new() {
        let entry = ConfigEntry::new("duofern", "DuoFern stick");
        assert_eq!(entry.domain, "duofern");
        assert_eq!(entry.title, "DuoFern stick");
        assert_eq!(entry.state, ConfigEntryState::NotLoaded);
        assert_eq!(entry.version, 1);
        assert!(!entry.entry_id.is_empty());
        assert!(!entry.is_disabled());
    }

    #[test]
    fn test_config_entry_builder() {
        let entry = ConfigEntry::new("duofern", "DuoFern stick")
            .with_data_value("serial_port", "/dev/ttyUSB0")
            .with_data_value("code", "6f3a")
            .with_unique_id("6f3a")
            .with_source(ConfigEntrySource::Import);

        assert_eq!(entry.unique_id, Some("6f3a".to_string()));
        assert_eq!(entry.source, ConfigEntrySource::Import);
        assert_eq!(entry.data.get("code"), Some(&json!("6f3a")));
    }

    #[test]
    fn test_runtime_state_not_persisted() {
        let mut entry = ConfigEntry::new("duofern", "DuoFern stick");
        entry.state = ConfigEntryState::Loaded;
        entry.reason = Some("ok".to_string());

        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("state").is_none());
        assert!(json.get("reason").is_none());

        let parsed: ConfigEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.state, ConfigEntryState::NotLoaded);
        assert_eq!(parsed.entry_id, entry.entry_id);
    }

    #[test]
    fn test_deserialize_minimal_entry() {
        let parsed: ConfigEntry = serde_json::from_value(json!({
            "entry_id": "01J000000000000000000000AA",
            "domain": "duofern",
            "title": "Stick",
            "options": {"ignored": true},
            "data": {"serial_port": "/dev/ttyUSB0", "code": "6f3a", "config_file": "/config/duofern.json"}
        }))
        .unwrap();

        assert_eq!(parsed.source, ConfigEntrySource::User);
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.data.len(), 3);
    }
}
