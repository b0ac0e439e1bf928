//! Service call type for invoking Home Assistant services

use crate::Context;
use serde::{Deserialize, Serialize};

/// A call to a `domain.service` with its data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCall {
    /// The domain the service belongs to (e.g., "light", "group")
    pub domain: String,

    /// The service name (e.g., "turn_on", "set")
    pub service: String,

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

    /// Get the full service identifier (domain.service)
    pub fn service_id(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }

    /// Deserialize the whole service data into a typed payload
    pub fn data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.service_data.clone())
    }
}

/// Split a `domain.service` identifier at its first `.`
pub fn split_service_id(service_id: &str) -> Option<(&str, &str)> {
    service_id
        .split_once('.')
        .filter(|(domain, service)| !domain.is_empty() && !service.is_empty())
}

/// Whether a service supports returning a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportsResponse {
    #[default]
    None,
    Optional,
    Only,
}
