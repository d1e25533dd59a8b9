//! Shared fixtures for the duofern integration tests

#![allow(dead_code)]

use ha_config::Value;
use ha_config_entries::{ConfigEntries, ConfigEntry};
use ha_core::EntityId;
use ha_duofern::{
    DeviceCode, DeviceModule, DeviceUpdate, DriverError, DriverResult, DuofernDriver,
    DuofernEntity, HomeAssistant, ModulesSnapshot, RefreshError, StickConfig, UpdatesCallback,
    CONF_CODE, CONF_CONFIG_FILE, CONF_SERIAL_PORT, DOMAIN,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A call the integration made on the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Start,
    Pair(Duration),
    Unpair(Duration),
    SyncDevices,
    CleanConfig,
    SendCommand(String, String),
}

/// Driver that records calls instead of talking to a stick
#[derive(Default)]
pub struct MockDriver {
    calls: Mutex<Vec<DriverCall>>,
    modules: Mutex<BTreeMap<DeviceCode, DeviceModule>>,
    callbacks: Mutex<Vec<UpdatesCallback>>,
    config: Mutex<Option<StickConfig>>,
    fail_commands: AtomicBool,
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_devices(codes: &[&str]) -> Arc<Self> {
        let driver = Self::new();
        for code in codes {
            driver.add_device(code);
        }
        driver
    }

    pub fn add_device(&self, code: &str) {
        self.modules
            .lock()
            .unwrap()
            .insert(DeviceCode::new(code), DeviceModule::new(code));
    }

    /// Make every driver call fail with a communication error
    pub fn fail_commands(&self) {
        self.fail_commands.store(true, Ordering::SeqCst);
    }

    /// Factory handing out this driver and remembering the config it got
    pub fn factory(
        self: &Arc<Self>,
    ) -> impl Fn(&StickConfig) -> DriverResult<Arc<dyn DuofernDriver>> + Send + Sync {
        let driver = Arc::clone(self);
        move |config: &StickConfig| {
            *driver.config.lock().unwrap() = Some(config.clone());
            Ok(driver.clone() as Arc<dyn DuofernDriver>)
        }
    }

    pub fn config(&self) -> Option<StickConfig> {
        self.config.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &DriverCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn commands(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DriverCall::SendCommand(device, command) => Some((device, command)),
                _ => None,
            })
            .collect()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }

    /// Deliver an update to every registered callback, as the stick would
    pub fn push_update(&self, update: DeviceUpdate) {
        let callbacks = self.callbacks.lock().unwrap().clone();
        for callback in callbacks {
            callback(update.clone());
        }
    }

    fn record(&self, call: DriverCall) -> DriverResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(DriverError::Communication("stick unplugged".to_string()));
        }
        Ok(())
    }
}

impl DuofernDriver for MockDriver {
    fn start(&self) -> DriverResult<()> {
        self.record(DriverCall::Start)
    }

    fn pair(&self, timeout: Duration) -> DriverResult<()> {
        self.record(DriverCall::Pair(timeout))
    }

    fn unpair(&self, timeout: Duration) -> DriverResult<()> {
        self.record(DriverCall::Unpair(timeout))
    }

    fn sync_devices(&self) -> DriverResult<()> {
        self.record(DriverCall::SyncDevices)
    }

    fn clean_config(&self) -> DriverResult<()> {
        self.record(DriverCall::CleanConfig)
    }

    fn send_command(&self, device: &DeviceCode, command: &str) -> DriverResult<()> {
        self.record(DriverCall::SendCommand(
            device.to_string(),
            command.to_string(),
        ))
    }

    fn modules_snapshot(&self) -> ModulesSnapshot {
        ModulesSnapshot {
            by_code: self.modules.lock().unwrap().clone(),
        }
    }

    fn add_updates_callback(&self, callback: UpdatesCallback) {
        self.callbacks.lock().unwrap().push(callback);
    }
}

/// Entity counting how often it was asked to refresh
pub struct MockEntity {
    entity_id: EntityId,
    enabled: AtomicBool,
    ready: AtomicBool,
    failing: AtomicBool,
    refreshes: AtomicUsize,
}

impl MockEntity {
    pub fn new(entity_id: &str) -> Arc<Self> {
        Arc::new(Self {
            entity_id: entity_id.parse().unwrap(),
            enabled: AtomicBool::new(true),
            ready: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl DuofernEntity for MockEntity {
    fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn schedule_update(&self, force_refresh: bool) -> Result<(), RefreshError> {
        assert!(force_refresh, "device updates always force a refresh");
        if !self.ready.load(Ordering::SeqCst) {
            return Err(RefreshError::NotReady);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RefreshError::Failed("device offline".to_string()));
        }
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn yaml(content: &str) -> Value {
    serde_yaml::from_str(content).unwrap()
}

/// Host with in-memory config entries and the given configuration.yaml
pub fn hass(config_yaml: &str) -> HomeAssistant {
    HomeAssistant::new("/config", yaml(config_yaml), ConfigEntries::in_memory())
}

pub fn stick_entry(serial_port: &str, code: &str) -> ConfigEntry {
    ConfigEntry::new(DOMAIN, "DuoFern stick")
        .with_data_value(CONF_SERIAL_PORT, serial_port)
        .with_data_value(CONF_CODE, code)
        .with_data_value(CONF_CONFIG_FILE, "/config/duofern.json")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ha_duofern=debug")
        .with_test_writer()
        .try_init();
}

/// Poll `cond` for up to a second
pub async fn wait_until(cond: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
