//! Entities backed by stick devices, and the registry that maps device
//! codes to them

use crate::driver::DeviceCode;
use dashmap::DashMap;
use ha_core::EntityId;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The entity has not been added to the host yet
    #[error("entity is not ready")]
    NotReady,

    #[error("refresh failed: {0}")]
    Failed(String),
}

/// An entity the platforms created for a stick device
pub trait DuofernEntity: Send + Sync {
    fn entity_id(&self) -> &EntityId;

    /// Disabled entities are not refreshed on device updates
    fn enabled(&self) -> bool {
        true
    }

    /// Queue a state write, re-reading the device when `force_refresh` is set
    fn schedule_update(&self, force_refresh: bool) -> Result<(), RefreshError>;
}

/// Device code to entity lookup shared by platforms and callbacks
#[derive(Default)]
pub struct DeviceRegistry {
    devices: DashMap<DeviceCode, Arc<dyn DuofernEntity>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity, returning the one it replaced
    pub fn register(
        &self,
        code: impl Into<DeviceCode>,
        entity: Arc<dyn DuofernEntity>,
    ) -> Option<Arc<dyn DuofernEntity>> {
        let code = code.into();
        debug!(code = %code, entity_id = %entity.entity_id(), "Registering duofern entity");
        self.devices.insert(code, entity)
    }

    pub fn get(&self, code: &DeviceCode) -> Option<Arc<dyn DuofernEntity>> {
        self.devices.get(code).map(|r| Arc::clone(r.value()))
    }

    pub fn remove(&self, code: &DeviceCode) -> Option<Arc<dyn DuofernEntity>> {
        self.devices.remove(code).map(|(_, entity)| entity)
    }

    pub fn contains(&self, code: &DeviceCode) -> bool {
        self.devices.contains_key(code)
    }

    /// Registered codes, sorted
    pub fn codes(&self) -> Vec<DeviceCode> {
        let mut codes: Vec<_> = self.devices.iter().map(|r| r.key().clone()).collect();
        codes.sort();
        codes
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("codes", &self.codes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(EntityId);

    impl DuofernEntity for Fixed {
        fn entity_id(&self) -> &EntityId {
            &self.0
        }

        fn schedule_update(&self, _force_refresh: bool) -> Result<(), RefreshError> {
            Ok(())
        }
    }

    fn entity(id: &str) -> Arc<dyn DuofernEntity> {
        Arc::new(Fixed(id.parse().unwrap()))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = DeviceRegistry::new();
        assert!(registry.register("40a1b2", entity("cover.40a1b2")).is_none());
        registry.register("43c0ff", entity("switch.43c0ff"));

        let found = registry.get(&"40a1b2".into()).unwrap();
        assert_eq!(found.entity_id().to_string(), "cover.40a1b2");
        assert!(found.enabled());
        assert!(registry.get(&"ffffff".into()).is_none());
        assert_eq!(
            registry.codes(),
            vec![DeviceCode::new("40a1b2"), DeviceCode::new("43c0ff")]
        );
    }

    #[test]
    fn test_register_replaces() {
        let registry = DeviceRegistry::new();
        registry.register("40a1b2", entity("cover.40a1b2"));
        let old = registry.register("40a1b2", entity("cover.living_room"));

        assert_eq!(old.unwrap().entity_id().to_string(), "cover.40a1b2");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove() {
        let registry = DeviceRegistry::new();
        registry.register("40a1b2", entity("cover.40a1b2"));

        assert!(registry.remove(&"40a1b2".into()).is_some());
        assert!(!registry.contains(&"40a1b2".into()));
        assert!(registry.is_empty());
    }
}
