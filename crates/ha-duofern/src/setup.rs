//! Integration setup and teardown

use crate::callbacks::{StartupHook, UpdateCallback};
use crate::config::resolve_stick_config;
use crate::constants::DOMAIN;
use crate::context::DuofernContext;
use crate::discovery::PlatformLoader;
use crate::driver::DriverFactory;
use crate::error::SetupResult;
use crate::hass::HomeAssistant;
use crate::services::{register_services, ServiceHandlers};
use ha_config_entries::ConfigEntry;
use ha_core::events::HOMEASSISTANT_STARTED;
use ha_core::Context;
use ha_event_bus::ListenerHandle;
use ha_service_registry::SharedServiceRegistry;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A set-up duofern stick
pub struct DuofernIntegration {
    ctx: DuofernContext,
    platforms: PlatformLoader,
    services: SharedServiceRegistry,
    startup_listener: ListenerHandle,
}

impl DuofernIntegration {
    pub fn context(&self) -> &DuofernContext {
        &self.ctx
    }

    pub fn platforms(&self) -> &PlatformLoader {
        &self.platforms
    }

    /// Unregister the services and stop waiting for startup
    ///
    /// Returns the number of services removed.
    pub fn unload(self) -> usize {
        let removed = self.services.unregister_domain(DOMAIN);
        self.startup_listener.remove();
        info!("Unloaded duofern, removed {} services", removed);
        removed
    }
}

/// Set up the integration
///
/// Resolves the stick configuration, creates the driver, registers the
/// services, announces the platforms and hooks driver start to
/// `homeassistant_started`. Must be called from within a Tokio runtime.
#[instrument(skip_all, fields(domain = DOMAIN))]
pub fn setup(hass: &HomeAssistant, factory: &dyn DriverFactory) -> SetupResult<DuofernIntegration> {
    hass.config_entries
        .register_setup_handler(DOMAIN, Arc::new(setup_entry));

    let stick_config = resolve_stick_config(&hass.config_entries, &hass.config, &hass.config_dir)?;
    info!(
        serial_port = %stick_config.serial_port,
        config_file = %stick_config.config_file.display(),
        "Setting up duofern stick"
    );

    let driver = factory.create(&stick_config)?;
    let ctx = DuofernContext::new(driver);
    let platforms = PlatformLoader::new(hass.bus.clone(), &hass.config);

    register_services(
        &hass.services,
        ServiceHandlers::new(ctx.clone(), platforms.clone()),
    )?;

    platforms.load_all(&Context::new());

    ctx.driver()
        .add_updates_callback(UpdateCallback::new(ctx.clone()).into_driver_callback());

    let hook = StartupHook::new(Arc::clone(ctx.driver()));
    let startup_listener = hass.bus.listen_once(HOMEASSISTANT_STARTED, move |_event| {
        let hook = hook.clone();
        tokio::task::spawn_blocking(move || hook.run());
    });

    Ok(DuofernIntegration {
        ctx,
        platforms,
        services: Arc::clone(&hass.services),
        startup_listener,
    })
}

/// Config entry setup; the stick itself is set up by [`setup`]
pub fn setup_entry(entry: &ConfigEntry) -> Result<(), String> {
    debug!(entry_id = %entry.entry_id, "duofern config entry set up");
    Ok(())
}
