use crate::driver::DuofernDriver;
use crate::entity::DeviceRegistry;
use std::sync::Arc;

/// Shared state of one set-up stick: the driver and the entities for its
/// devices
///
/// Cloned into every service handler and callback.
#[derive(Clone)]
pub struct DuofernContext {
    driver: Arc<dyn DuofernDriver>,
    devices: Arc<DeviceRegistry>,
}

impl DuofernContext {
    pub fn new(driver: Arc<dyn DuofernDriver>) -> Self {
        Self::with_devices(driver, Arc::new(DeviceRegistry::new()))
    }

    pub fn with_devices(driver: Arc<dyn DuofernDriver>, devices: Arc<DeviceRegistry>) -> Self {
        Self { driver, devices }
    }

    pub fn driver(&self) -> &Arc<dyn DuofernDriver> {
        &self.driver
    }

    pub fn devices(&self) -> &Arc<DeviceRegistry> {
        &self.devices
    }
}

impl std::fmt::Debug for DuofernContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuofernContext")
            .field("devices", &self.devices)
            .finish_non_exhaustive()
    }
}
