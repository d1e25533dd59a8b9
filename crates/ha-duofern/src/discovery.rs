//! Announces the duofern platforms to their components

use crate::constants::{DOMAIN, DUOFERN_COMPONENTS};
use ha_config::{to_json, Value};
use ha_core::events::PlatformDiscoveredData;
use ha_core::Context;
use ha_event_bus::SharedEventBus;
use serde_json::json;
use tracing::debug;

/// Fires one `load_platform` discovery per duofern component
#[derive(Clone)]
pub struct PlatformLoader {
    bus: SharedEventBus,
    /// Root configuration forwarded with every discovery
    hass_config: serde_json::Value,
}

impl PlatformLoader {
    pub fn new(bus: SharedEventBus, hass_config: &Value) -> Self {
        Self {
            bus,
            hass_config: to_json(hass_config),
        }
    }

    /// Ask `component` to load the duofern platform
    pub fn load(&self, component: &str, context: &Context) {
        debug!(component, "Announcing duofern platform");
        self.bus.fire_typed(
            PlatformDiscoveredData::load_platform(
                component,
                DOMAIN,
                json!({}),
                self.hass_config.clone(),
            ),
            context.clone(),
        );
    }

    pub fn load_all(&self, context: &Context) {
        for component in DUOFERN_COMPONENTS {
            self.load(component, context);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ha_event_bus::EventBus;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_load_all_announces_every_component() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe_typed::<PlatformDiscoveredData>();
        let config: Value = serde_yaml::from_str("duofern:\n  code: 6f3a\n").unwrap();

        let context = Context::new();
        PlatformLoader::new(bus.clone(), &config).load_all(&context);

        let mut components = Vec::new();
        while let Some(event) = rx.try_recv() {
            assert_eq!(event.context, context);
            assert_eq!(event.data.platform, "duofern");
            assert_eq!(event.data.discovered, json!({}));
            assert_eq!(event.data.hass_config, json!({"duofern": {"code": "6f3a"}}));
            components.push(event.data.component().unwrap().to_string());
        }
        assert_eq!(components, DUOFERN_COMPONENTS);
    }
}
