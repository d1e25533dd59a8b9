//! Core types for Home Assistant
//!
//! The fundamental types shared by the host crates and the integrations
//! that plug into them: EntityId, Event, Context, and ServiceCall.

mod context;
mod entity_id;
mod event;
mod service_call;

pub use context::Context;
pub use entity_id::{EntityId, EntityIdError};
pub use event::{Event, EventData, EventOrigin, EventType};
pub use service_call::{ServiceCall, SupportsResponse};

/// Standard event types used by Home Assistant
pub mod events {
    use super::*;

    /// Event type fired when Home Assistant begins starting
    pub const HOMEASSISTANT_START: &str = "homeassistant_start";

    /// Event type fired once Home Assistant has fully started
    pub const HOMEASSISTANT_STARTED: &str = "homeassistant_started";

    /// Event type announcing a platform to load for a component
    pub const PLATFORM_DISCOVERED: &str = "platform_discovered";

    /// Prefix of the discovery service name used by `load_platform`
    pub const LOAD_PLATFORM_PREFIX: &str = "load_platform";

    /// Data for PLATFORM_DISCOVERED events
    ///
    /// `service` is `load_platform.<component>`, `platform` the integration
    /// domain providing entities for that component.
    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    pub struct PlatformDiscoveredData {
        pub service: String,
        pub platform: String,
        #[serde(default)]
        pub discovered: serde_json::Value,
        #[serde(default)]
        pub hass_config: serde_json::Value,
    }

    impl PlatformDiscoveredData {
        /// Build the discovery payload asking `component` to load `platform`
        pub fn load_platform(
            component: &str,
            platform: impl Into<String>,
            discovered: serde_json::Value,
            hass_config: serde_json::Value,
        ) -> Self {
            Self {
                service: format!("{}.{}", LOAD_PLATFORM_PREFIX, component),
                platform: platform.into(),
                discovered,
                hass_config,
            }
        }

        /// The component named by a `load_platform.<component>` service
        pub fn component(&self) -> Option<&str> {
            self.service
                .strip_prefix(LOAD_PLATFORM_PREFIX)
                .and_then(|rest| rest.strip_prefix('.'))
        }
    }

    impl EventData for PlatformDiscoveredData {
        fn event_type() -> &'static str {
            PLATFORM_DISCOVERED
        }
    }

}
