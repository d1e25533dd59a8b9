//! Service registry with async handlers for Home Assistant
//!
//! This crate provides the ServiceRegistry, which manages all registered
//! services. A service may carry a JSON schema for its data: defaults
//! declared in the schema's top-level `properties` are filled in before the
//! data is validated and handed to the handler.

use dashmap::DashMap;
use ha_core::{Context, ServiceCall, SupportsResponse};
use jsonschema::JSONSchema;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Result type for service calls
pub type ServiceResult = Result<Option<Value>, ServiceError>;

/// Future type for async service handlers
pub type ServiceFuture = Pin<Box<dyn Future<Output = ServiceResult> + Send>>;

/// Service handler function type
pub type ServiceHandler = Arc<dyn Fn(ServiceCall) -> ServiceFuture + Send + Sync>;

/// Errors that can occur when working with services
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("service not found: {domain}.{service}")]
    NotFound { domain: String, service: String },

    #[error("service call failed: {0}")]
    CallFailed(String),

    #[error("invalid service data: {0}")]
    InvalidData(String),

    #[error("invalid schema for {domain}.{service}: {reason}")]
    InvalidSchema {
        domain: String,
        service: String,
        reason: String,
    },

    #[error("service does not support responses")]
    ResponseNotSupported,
}

/// Information about a registered service
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    pub domain: String,
    pub service: String,
    /// Human-readable name
    pub name: Option<String>,
    /// Description of what the service does
    pub description: Option<String>,
    /// JSON schema for service data
    pub schema: Option<Value>,
    pub supports_response: SupportsResponse,
}

impl ServiceDescription {
    pub fn new(domain: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            name: None,
            description: None,
            schema: None,
            supports_response: SupportsResponse::None,
        }
    }

    fn key(&self) -> String {
        service_key(&self.domain, &self.service)
    }
}

struct RegisteredService {
    handler: ServiceHandler,
    description: ServiceDescription,
    validator: Option<Arc<JSONSchema>>,
}

fn service_key(domain: &str, service: &str) -> String {
    format!("{}.{}", domain, service)
}

/// Fill in `default` values from the schema's top-level properties
///
/// Only keys that are missing are filled; a null payload becomes an object.
fn apply_defaults(schema: &Value, data: &mut Value) {
    if data.is_null() {
        *data = Value::Object(Map::new());
    }

    let (Some(properties), Some(object)) = (
        schema.get("properties").and_then(Value::as_object),
        data.as_object_mut(),
    ) else {
        return;
    };

    for (key, property) in properties {
        if let Some(default) = property.get("default") {
            object
                .entry(key.clone())
                .or_insert_with(|| default.clone());
        }
    }
}

/// The service registry manages all registered services
pub struct ServiceRegistry {
    /// Services indexed by "domain.service" key
    services: DashMap<String, RegisteredService>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register a service
    ///
    /// Re-registering an existing `domain.service` replaces the handler.
    /// Fails only if `schema` is not a valid JSON schema.
    #[instrument(skip(self, domain, service, handler, schema))]
    pub fn register<F, Fut>(
        &self,
        domain: impl Into<String>,
        service: impl Into<String>,
        handler: F,
        schema: Option<Value>,
        supports_response: SupportsResponse,
    ) -> Result<(), ServiceError>
    where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult> + Send + 'static,
    {
        let description = ServiceDescription {
            schema,
            supports_response,
            ..ServiceDescription::new(domain, service)
        };
        self.register_with_description(description, handler)
    }

    /// Register a service with full description
    #[instrument(
        skip(self, description, handler),
        fields(domain = %description.domain, service = %description.service)
    )]
    pub fn register_with_description<F, Fut>(
        &self,
        description: ServiceDescription,
        handler: F,
    ) -> Result<(), ServiceError>
    where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult> + Send + 'static,
    {
        let validator = match &description.schema {
            Some(schema) => {
                let compiled =
                    JSONSchema::compile(schema).map_err(|e| ServiceError::InvalidSchema {
                        domain: description.domain.clone(),
                        service: description.service.clone(),
                        reason: e.to_string(),
                    })?;
                Some(Arc::new(compiled))
            }
            None => None,
        };

        debug!("Registering service");

        let handler: ServiceHandler =
            Arc::new(move |call| Box::pin(handler(call)) as ServiceFuture);

        self.services.insert(
            description.key(),
            RegisteredService {
                handler,
                description,
                validator,
            },
        );
        Ok(())
    }

    /// Call a service
    ///
    /// Service data is defaulted and validated against the registered schema
    /// before the handler runs. The handler's response is only returned when
    /// `return_response` is set.
    #[instrument(skip(self, service_data, context))]
    pub async fn call(
        &self,
        domain: &str,
        service: &str,
        mut service_data: Value,
        context: Context,
        return_response: bool,
    ) -> ServiceResult {
        let registered = self
            .services
            .get(&service_key(domain, service))
            .ok_or_else(|| {
                warn!(domain = %domain, service = %service, "Service not found");
                ServiceError::NotFound {
                    domain: domain.to_string(),
                    service: service.to_string(),
                }
            })?;

        if return_response && registered.description.supports_response == SupportsResponse::None
        {
            return Err(ServiceError::ResponseNotSupported);
        }

        if let Some(schema) = &registered.description.schema {
            apply_defaults(schema, &mut service_data);
        } else if service_data.is_null() {
            service_data = Value::Object(Map::new());
        }

        if let Some(validator) = &registered.validator {
            if let Err(errors) = validator.validate(&service_data) {
                let reason = errors
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                warn!(domain = %domain, service = %service, %reason, "Rejected service data");
                return Err(ServiceError::InvalidData(reason));
            }
        }

        let handler = registered.handler.clone();
        // Release the map guard before awaiting the handler
        drop(registered);

        debug!(domain = %domain, service = %service, "Calling service");
        let call = ServiceCall::new(domain, service, service_data, context);
        let result = handler(call).await?;

        if return_response {
            Ok(result)
        } else {
            Ok(None)
        }
    }

    pub fn has_service(&self, domain: &str, service: &str) -> bool {
        self.services.contains_key(&service_key(domain, service))
    }

    pub fn get_service(&self, domain: &str, service: &str) -> Option<ServiceDescription> {
        self.services
            .get(&service_key(domain, service))
            .map(|s| s.description.clone())
    }

    /// All services of a domain, sorted by service name
    pub fn domain_services(&self, domain: &str) -> Vec<ServiceDescription> {
        let mut services: Vec<_> = self
            .services
            .iter()
            .filter(|s| s.description.domain == domain)
            .map(|s| s.description.clone())
            .collect();
        services.sort_by(|a, b| a.service.cmp(&b.service));
        services
    }

    /// Domains that have registered services
    pub fn domains(&self) -> Vec<String> {
        let mut domains: Vec<_> = self
            .services
            .iter()
            .map(|s| s.description.domain.clone())
            .collect();
        domains.sort();
        domains.dedup();
        domains
    }

    #[instrument(skip(self))]
    pub fn unregister(&self, domain: &str, service: &str) -> bool {
        let removed = self
            .services
            .remove(&service_key(domain, service))
            .is_some();

        if removed {
            debug!(domain = %domain, service = %service, "Unregistered service");
        }

        removed
    }

    /// Unregister all services for a domain, returning how many were removed
    #[instrument(skip(self))]
    pub fn unregister_domain(&self, domain: &str) -> usize {
        let mut count = 0;
        self.services.retain(|_, s| {
            let keep = s.description.domain != domain;
            if !keep {
                count += 1;
            }
            keep
        });

        debug!(domain = %domain, count = count, "Unregistered domain services");
        count
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for ServiceRegistry
pub type SharedServiceRegistry = Arc<ServiceRegistry>;
