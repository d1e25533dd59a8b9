//! The `duofern.*` services
//!
//! | service | data | driver call |
//! |---|---|---|
//! | `start_pairing` | `timeout` (s, default 30) | `pair` |
//! | `start_unpairing` | `timeout` (s, default 30) | `unpair` |
//! | `sync_devices` | - | `sync_devices`, then platforms are announced again |
//! | `clean_config` | - | `clean_config`, then `sync_devices` |
//! | `dump_device_state` | - | none; logs the device table and returns it |
//! | `ask_for_update` | `device_id` | `send_command(code, "getStatus")` |

use crate::constants::{
    ATTR_DEVICE_ID, ATTR_TIMEOUT, DEFAULT_PAIRING_TIMEOUT, DOMAIN, FALLBACK_PAIRING_TIMEOUT,
};
use crate::context::DuofernContext;
use crate::discovery::PlatformLoader;
use crate::driver::{DeviceCode, DriverError, GET_STATUS};
use crate::error::SetupResult;
use ha_core::{ServiceCall, SupportsResponse};
use ha_service_registry::{ServiceDescription, ServiceError, ServiceRegistry, ServiceResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info, warn};

/// Services registered under the `duofern` domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuofernService {
    StartPairing,
    StartUnpairing,
    SyncDevices,
    CleanConfig,
    DumpDeviceState,
    AskForUpdate,
}

impl DuofernService {
    pub const ALL: [DuofernService; 6] = [
        DuofernService::StartPairing,
        DuofernService::StartUnpairing,
        DuofernService::SyncDevices,
        DuofernService::CleanConfig,
        DuofernService::DumpDeviceState,
        DuofernService::AskForUpdate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DuofernService::StartPairing => "start_pairing",
            DuofernService::StartUnpairing => "start_unpairing",
            DuofernService::SyncDevices => "sync_devices",
            DuofernService::CleanConfig => "clean_config",
            DuofernService::DumpDeviceState => "dump_device_state",
            DuofernService::AskForUpdate => "ask_for_update",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DuofernService::StartPairing => "Open the stick's pairing window",
            DuofernService::StartUnpairing => "Open the stick's unpairing window",
            DuofernService::SyncDevices => "Query all paired devices and reload platforms",
            DuofernService::CleanConfig => "Drop unpaired devices from the stick config",
            DuofernService::DumpDeviceState => "Log the state of all known devices",
            DuofernService::AskForUpdate => "Ask a single device for its status",
        }
    }

    /// JSON schema of the service data, if the service takes any
    pub fn schema(&self) -> Option<Value> {
        match self {
            DuofernService::StartPairing | DuofernService::StartUnpairing => Some(json!({
                "type": "object",
                "properties": {
                    "timeout": {
                        "anyOf": [
                            {"type": "number", "minimum": 0},
                            {"type": "string", "pattern": r"^\s*\+?[0-9]+\s*$"}
                        ],
                        "default": DEFAULT_PAIRING_TIMEOUT
                    }
                }
            })),
            DuofernService::AskForUpdate => Some(json!({
                "type": "object",
                "properties": {
                    "device_id": {"type": "string"}
                },
                "required": ["device_id"]
            })),
            DuofernService::SyncDevices
            | DuofernService::CleanConfig
            | DuofernService::DumpDeviceState => None,
        }
    }

    pub fn supports_response(&self) -> SupportsResponse {
        match self {
            DuofernService::DumpDeviceState => SupportsResponse::Optional,
            _ => SupportsResponse::None,
        }
    }

    fn service_description(&self) -> ServiceDescription {
        ServiceDescription {
            name: Some(self.name().replace('_', " ")),
            description: Some(self.description().to_string()),
            schema: self.schema(),
            supports_response: self.supports_response(),
            ..ServiceDescription::new(DOMAIN, self.name())
        }
    }
}

/// Extract the stick's device code from a Home Assistant device id
///
/// `light.3f2a` becomes `3f2a`. Input without a `<prefix>.<hex>` part is
/// returned unchanged.
pub fn extract_device_code(hass_device_id: &str) -> Result<DeviceCode, ServiceError> {
    static DEVICE_ID_PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

    let pattern = DEVICE_ID_PATTERN
        .get_or_init(|| Regex::new(r"[^.]*\.([0-9a-fA-F]+)"))
        .as_ref()
        .map_err(|e| ServiceError::CallFailed(format!("invalid device id pattern: {}", e)))?;

    Ok(DeviceCode::new(
        pattern.replace_all(hass_device_id, "$1").into_owned(),
    ))
}

/// Whole seconds from a number or numeric string; fractions are truncated
fn coerce_timeout(raw: &Value) -> Option<u64> {
    match raw {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.trunc() as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn call_failed(e: DriverError) -> ServiceError {
    ServiceError::CallFailed(e.to_string())
}

/// Handlers for every duofern service
///
/// Driver calls may block on serial I/O, so handlers are plain functions
/// run on the blocking pool by [`register_services`].
#[derive(Clone)]
pub struct ServiceHandlers {
    ctx: DuofernContext,
    platforms: PlatformLoader,
}

impl ServiceHandlers {
    pub fn new(ctx: DuofernContext, platforms: PlatformLoader) -> Self {
        Self { ctx, platforms }
    }

    pub fn dispatch(&self, service: DuofernService, call: &ServiceCall) -> ServiceResult {
        match service {
            DuofernService::StartPairing => self.start_pairing(call),
            DuofernService::StartUnpairing => self.start_unpairing(call),
            DuofernService::SyncDevices => self.sync_devices(call),
            DuofernService::CleanConfig => self.clean_config(call),
            DuofernService::DumpDeviceState => self.dump_device_state(call),
            DuofernService::AskForUpdate => self.ask_for_update(call),
        }
    }

    fn timeout(call: &ServiceCall) -> Result<Duration, ServiceError> {
        match call.get_raw(ATTR_TIMEOUT) {
            None => Ok(Duration::from_secs(FALLBACK_PAIRING_TIMEOUT)),
            Some(raw) => coerce_timeout(raw).map(Duration::from_secs).ok_or_else(|| {
                ServiceError::InvalidData(format!(
                    "{} must be a non-negative integer, got {}",
                    ATTR_TIMEOUT, raw
                ))
            }),
        }
    }

    pub fn start_pairing(&self, call: &ServiceCall) -> ServiceResult {
        warn!("start pairing");
        self.ctx
            .driver()
            .pair(Self::timeout(call)?)
            .map_err(call_failed)?;
        Ok(None)
    }

    pub fn start_unpairing(&self, call: &ServiceCall) -> ServiceResult {
        warn!("start unpairing");
        self.ctx
            .driver()
            .unpair(Self::timeout(call)?)
            .map_err(call_failed)?;
        Ok(None)
    }

    pub fn sync_devices(&self, call: &ServiceCall) -> ServiceResult {
        self.ctx.driver().sync_devices().map_err(call_failed)?;
        warn!(service_data = %call.service_data, "sync devices");
        self.platforms.load_all(&call.context.child());
        Ok(None)
    }

    pub fn clean_config(&self, _call: &ServiceCall) -> ServiceResult {
        let driver = self.ctx.driver();
        driver.clean_config().map_err(call_failed)?;
        driver.sync_devices().map_err(call_failed)?;
        Ok(None)
    }

    pub fn dump_device_state(&self, _call: &ServiceCall) -> ServiceResult {
        let snapshot = self.ctx.driver().modules_snapshot();
        let modules = serde_json::to_value(&snapshot)
            .map_err(|e| ServiceError::CallFailed(e.to_string()))?;
        warn!("{}", modules);
        Ok(Some(modules))
    }

    pub fn ask_for_update(&self, call: &ServiceCall) -> ServiceResult {
        let Some(raw) = call.get_raw(ATTR_DEVICE_ID) else {
            warn!("device_id missing from call {}", call.service_data);
            return Ok(None);
        };

        let Some(hass_device_id) = raw.as_str() else {
            error!(
                "exception while getting device id {}, {}",
                call.service_id(),
                call.service_data
            );
            return Err(ServiceError::InvalidData(format!(
                "{} must be a string, got {}",
                ATTR_DEVICE_ID, raw
            )));
        };

        let code = extract_device_code(hass_device_id)?;
        let driver = self.ctx.driver();
        if driver.lookup_device(&code).is_none() {
            let snapshot = driver.modules_snapshot();
            warn!(
                "{} is not a valid duofern device, I only know {:?}",
                code,
                snapshot.codes()
            );
            return Ok(None);
        }

        driver.send_command(&code, GET_STATUS).map_err(call_failed)?;
        Ok(None)
    }
}

/// Register every duofern service with `services`
pub fn register_services(services: &ServiceRegistry, handlers: ServiceHandlers) -> SetupResult<()> {
    for service in DuofernService::ALL {
        let handlers = handlers.clone();
        services.register_with_description(service.service_description(), move |call| {
            let handlers = handlers.clone();
            async move {
                tokio::task::spawn_blocking(move || handlers.dispatch(service, &call))
                    .await
                    .map_err(|e| ServiceError::CallFailed(e.to_string()))?
            }
        })?;
    }

    info!("Registered {} duofern services", DuofernService::ALL.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_device_code() {
        assert_eq!(extract_device_code("light.3f2a").unwrap().as_str(), "3f2a");
        assert_eq!(
            extract_device_code("cover.40A1B2").unwrap().as_str(),
            "40A1B2"
        );
        assert_eq!(extract_device_code("40a1b2").unwrap().as_str(), "40a1b2");
    }

    #[test]
    fn test_extract_keeps_trailing_text() {
        assert_eq!(
            extract_device_code("cover.40a1b2_position")
                .unwrap()
                .as_str(),
            "40a1b2_position"
        );
    }

    #[test]
    fn test_service_names() {
        let names: Vec<_> = DuofernService::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "start_pairing",
                "start_unpairing",
                "sync_devices",
                "clean_config",
                "dump_device_state",
                "ask_for_update"
            ]
        );
        for service in DuofernService::ALL {
            assert_eq!(
                serde_json::to_value(service).unwrap(),
                json!(service.name())
            );
        }
    }

    #[test]
    fn test_only_dump_returns_a_response() {
        for service in DuofernService::ALL {
            let expected = if service == DuofernService::DumpDeviceState {
                SupportsResponse::Optional
            } else {
                SupportsResponse::None
            };
            assert_eq!(service.supports_response(), expected);
        }
    }

    #[test]
    fn test_pairing_schema_default() {
        let schema = DuofernService::StartPairing.schema().unwrap();
        assert_eq!(schema["properties"]["timeout"]["default"], json!(30));
        assert!(DuofernService::SyncDevices.schema().is_none());
    }

    #[test]
    fn test_coerce_timeout() {
        assert_eq!(coerce_timeout(&json!(45)), Some(45));
        assert_eq!(coerce_timeout(&json!(45.0)), Some(45));
        assert_eq!(coerce_timeout(&json!(45.9)), Some(45));
        assert_eq!(coerce_timeout(&json!("45")), Some(45));
        assert_eq!(coerce_timeout(&json!(" +45 ")), Some(45));
        assert_eq!(coerce_timeout(&json!(0)), Some(0));

        assert_eq!(coerce_timeout(&json!(-1)), None);
        assert_eq!(coerce_timeout(&json!(-0.5)), None);
        assert_eq!(coerce_timeout(&json!("abc")), None);
        assert_eq!(coerce_timeout(&json!("4.5")), None);
        assert_eq!(coerce_timeout(&json!(true)), None);
        assert_eq!(coerce_timeout(&json!([30])), None);
    }
}
