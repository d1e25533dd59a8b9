//! Domain name, configuration keys and defaults

/// Integration domain
pub const DOMAIN: &str = "duofern";

/// Components the integration provides entities for
pub const DUOFERN_COMPONENTS: [&str; 6] =
    ["cover", "light", "switch", "sensor", "binary_sensor", "climate"];

pub const CONF_SERIAL_PORT: &str = "serial_port";
pub const CONF_CODE: &str = "code";
pub const CONF_CONFIG_FILE: &str = "config_file";

/// Service data key of `ask_for_update`
pub const ATTR_DEVICE_ID: &str = "device_id";
/// Service data key of `start_pairing` / `start_unpairing`
pub const ATTR_TIMEOUT: &str = "timeout";

pub const DEFAULT_SERIAL_PORT: &str =
    "/dev/serial/by-id/usb-Rademacher_DuoFern_USB-Stick_WR04ZFP4-if00-port0";

/// Default advertised by the `duofern:` section schema
pub const DEFAULT_CODE: &str = "0000";

/// Code used when a legacy YAML section omits `code`
pub const LEGACY_FALLBACK_CODE: &str = "affe";

/// Stick state file name, relative to the config directory
pub const DEFAULT_CONFIG_FILE_NAME: &str = "duofern.json";

/// Pairing window filled in by the service schema, in seconds
pub const DEFAULT_PAIRING_TIMEOUT: u64 = 30;

/// Pairing window when a call reaches the handler without `timeout`
pub const FALLBACK_PAIRING_TIMEOUT: u64 = 60;
