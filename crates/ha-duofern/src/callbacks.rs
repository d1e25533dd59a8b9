//! Driver update callback and the startup hook

use crate::context::DuofernContext;
use crate::driver::{DeviceCode, DeviceUpdate, DuofernDriver, UpdatesCallback};
use crate::entity::RefreshError;
use std::sync::Arc;
use tracing::{debug, error, info};

/// What a device update led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The update carried no device id
    Ignored,
    Refreshed,
    /// The entity is disabled
    Disabled,
    /// The entity exists but the host has not added it yet
    NotReady,
    UnknownDevice,
    Failed(String),
}

/// Routes driver updates to the entity of the reporting device
#[derive(Clone)]
pub struct UpdateCallback {
    ctx: DuofernContext,
}

impl UpdateCallback {
    pub fn new(ctx: DuofernContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, update: DeviceUpdate) -> UpdateOutcome {
        let Some(device_id) = update.device_id else {
            return UpdateOutcome::Ignored;
        };

        info!("Update callback for {}", device_id);
        debug!(key = ?update.key, value = ?update.value, "Device update");

        let Some(entity) = self.ctx.devices().get(&DeviceCode::new(device_id)) else {
            info!("Update callback called on unknown device id");
            return UpdateOutcome::UnknownDevice;
        };

        if !entity.enabled() {
            return UpdateOutcome::Disabled;
        }

        match entity.schedule_update(true) {
            Ok(()) => UpdateOutcome::Refreshed,
            Err(RefreshError::NotReady) => {
                info!("Update callback called before Home Assistant is ready");
                UpdateOutcome::NotReady
            }
            Err(RefreshError::Failed(reason)) => {
                error!(entity_id = %entity.entity_id(), "Refresh failed: {}", reason);
                UpdateOutcome::Failed(reason)
            }
        }
    }

    /// Wrap into the callback type the driver accepts
    pub fn into_driver_callback(self) -> UpdatesCallback {
        Arc::new(move |update| {
            self.handle(update);
        })
    }
}

/// Starts stick communication once the host is up
#[derive(Clone)]
pub struct StartupHook {
    driver: Arc<dyn DuofernDriver>,
}

impl StartupHook {
    pub fn new(driver: Arc<dyn DuofernDriver>) -> Self {
        Self { driver }
    }

    pub fn run(&self) {
        info!("Home Assistant started, starting duofern stick");
        if let Err(e) = self.driver.start() {
            error!("Failed to start duofern stick: {}", e);
        }
    }
}
