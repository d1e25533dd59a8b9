//! The slice of the host the integration is set up against

use crate::error::HostResult;
use ha_config::{load_yaml, Value};
use ha_config_entries::{ConfigEntries, Storage};
use ha_core::events::{HOMEASSISTANT_START, HOMEASSISTANT_STARTED};
use ha_core::{Context, Event};
use ha_event_bus::{EventBus, SharedEventBus};
use ha_service_registry::{ServiceRegistry, SharedServiceRegistry};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Root configuration file inside the config directory
pub const CONFIGURATION_FILE: &str = "configuration.yaml";

/// Host handles passed to integration setup
pub struct HomeAssistant {
    pub bus: SharedEventBus,
    pub services: SharedServiceRegistry,
    pub config_entries: Arc<ConfigEntries>,
    /// Root of configuration.yaml, tags already resolved
    pub config: Value,
    pub config_dir: PathBuf,
}

impl HomeAssistant {
    pub fn new(config_dir: impl Into<PathBuf>, config: Value, config_entries: ConfigEntries) -> Self {
        Self {
            bus: Arc::new(EventBus::new()),
            services: Arc::new(ServiceRegistry::new()),
            config_entries: Arc::new(config_entries),
            config,
            config_dir: config_dir.into(),
        }
    }

    /// Load configuration.yaml and the stored config entries of `config_dir`
    pub async fn load(config_dir: impl AsRef<Path>) -> HostResult<Self> {
        let config_dir = config_dir.as_ref();
        let config = load_yaml(config_dir, CONFIGURATION_FILE)?;

        let config_entries = ConfigEntries::new(Storage::new(config_dir));
        config_entries.load().await?;

        info!(
            config_dir = %config_dir.display(),
            entries = config_entries.len(),
            "Loaded configuration"
        );
        Ok(Self::new(config_dir, config, config_entries))
    }

    /// Fire `homeassistant_start` followed by `homeassistant_started`
    pub fn start(&self) {
        let context = Context::new();
        for event_type in [HOMEASSISTANT_START, HOMEASSISTANT_STARTED] {
            self.bus
                .fire(Event::new(event_type, json!({}), context.clone()));
        }
    }
}
