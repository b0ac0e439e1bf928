//! Service registry with async handlers for Home Assistant
//!
//! This crate provides the ServiceRegistry, which routes `domain.service`
//! calls to registered async handlers. A service may declare a JSON schema;
//! call data is validated against it before the handler runs.

use dashmap::DashMap;
use ha_core::{Context, ServiceCall, SupportsResponse};
use jsonschema::JSONSchema;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Result type for service calls
pub type ServiceResult = Result<Option<serde_json::Value>, ServiceError>;

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

    #[error("service does not support responses")]
    ResponseNotSupported,
}

/// Information about a registered service
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    pub domain: String,
    pub service: String,
    /// JSON schema for service data (optional)
    pub schema: Option<serde_json::Value>,
    pub supports_response: SupportsResponse,
}

/// Internal representation of a registered service
struct RegisteredService {
    handler: ServiceHandler,
    description: ServiceDescription,
}

/// The service registry manages all registered services
pub struct ServiceRegistry {
    /// Services indexed by "domain.service" key
    services: DashMap<String, RegisteredService>,
}

impl ServiceRegistry {
    /// Create a new empty service registry
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register a new service
    ///
    /// # Arguments
    /// * `domain` - The domain the service belongs to (e.g., "light")
    /// * `service` - The service name (e.g., "turn_on")
    /// * `handler` - Async function to handle service calls
    /// * `schema` - Optional JSON schema for validating service data
    /// * `supports_response` - Whether the service can return a response
    #[instrument(skip(self, domain, service, handler, schema))]
    pub fn register<F, Fut>(
        &self,
        domain: impl Into<String>,
        service: impl Into<String>,
        handler: F,
        schema: Option<serde_json::Value>,
        supports_response: SupportsResponse,
    ) where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult> + Send + 'static,
    {
        let domain = domain.into();
        let service = service.into();
        let key = format!("{}.{}", domain, service);

        debug!(domain = %domain, service = %service, "Registering service");

        let handler: ServiceHandler =
            Arc::new(move |call| Box::pin(handler(call)) as ServiceFuture);

        self.services.insert(
            key,
            RegisteredService {
                handler,
                description: ServiceDescription {
                    domain,
                    service,
                    schema,
                    supports_response,
                },
            },
        );
    }

    /// Call a service
    ///
    /// # Arguments
    /// * `domain` - The domain of the service
    /// * `service` - The service name
    /// * `service_data` - Data to pass to the service
    /// * `context` - Context for tracking the call origin
    /// * `return_response` - Whether to return the service response
    #[instrument(skip(self, service_data, context))]
    pub async fn call(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
        context: Context,
        return_response: bool,
    ) -> ServiceResult {
        let key = format!("{}.{}", domain, service);

        // The map guard must not live across the handler's await
        let handler = {
            let registered = self.services.get(&key).ok_or_else(|| {
                warn!(domain = %domain, service = %service, "Service not found");
                ServiceError::NotFound {
                    domain: domain.to_string(),
                    service: service.to_string(),
                }
            })?;

            if return_response
                && registered.description.supports_response == SupportsResponse::None
            {
                return Err(ServiceError::ResponseNotSupported);
            }

            if let Some(schema) = &registered.description.schema {
                validate(schema, &service_data)?;
            }

            registered.handler.clone()
        };

        let call = ServiceCall::new(domain, service, service_data, context);

        debug!(domain = %domain, service = %service, "Calling service");

        let result = handler(call).await?;

        if return_response {
            Ok(result)
        } else {
            Ok(None)
        }
    }

    /// Check if a service exists
    pub fn has_service(&self, domain: &str, service: &str) -> bool {
        self.services.contains_key(&format!("{}.{}", domain, service))
    }

    /// Get all services for a domain
    pub fn domain_services(&self, domain: &str) -> Vec<ServiceDescription> {
        self.services
            .iter()
            .filter(|s| s.description.domain == domain)
            .map(|s| s.description.clone())
            .collect()
    }
}

/// Check `data` against a service's JSON schema
fn validate(schema: &serde_json::Value, data: &serde_json::Value) -> Result<(), ServiceError> {
    let compiled = JSONSchema::compile(schema)
        .map_err(|e| ServiceError::CallFailed(format!("invalid service schema: {}", e)))?;

    let result = compiled.validate(data).map_err(|errors| {
        errors
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    });
    result.map_err(ServiceError::InvalidData)
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
