//! Service call type for invoking Home Assistant services

use crate::Context;
use serde::{Deserialize, Serialize};

/// A call to a registered service
///
/// Each service belongs to a domain; `service_data` is the (already
/// validated) argument object passed by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCall {
    /// The domain the service belongs to (e.g., "duofern")
    pub domain: String,

    /// The service name (e.g., "start_pairing")
    pub service: String,

    /// Arguments of the call
    pub service_data: serde_json::Value,

    /// Context tracking who initiated this call
    pub context: Context,
}

impl ServiceCall {
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        service_data: serde_json::Value,
        context: Context,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            service_data,
            context,
        }
    }

    /// Full service identifier (domain.service)
    pub fn service_id(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }

    /// Get the raw JSON value stored under `key`, treating null as absent
    pub fn get_raw(&self, key: &str) -> Option<&serde_json::Value> {
        self.service_data.get(key).filter(|v| !v.is_null())
    }
}

/// Whether a service supports returning a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportsResponse {
    /// Service never returns a response
    #[default]
    None,
    /// Service may optionally return a response
    Optional,
    /// Service always returns a response
    Only,
}
