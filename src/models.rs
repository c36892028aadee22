//! Data models for the Consul catalog and health APIs.
//!
//! These mirror the JSON shapes returned by the Consul HTTP API closely
//! enough to deserialize them directly, while keeping only the fields the
//! inventory engine reads.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Health status string Consul reports for a healthy check.
pub const STATUS_PASSING: &str = "passing";

/// A node as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogNode {
    /// Node name.
    #[serde(rename = "Node")]
    pub name: String,
    /// Node address (usually an IP).
    #[serde(rename = "Address", default)]
    pub address: String,
}

impl CatalogNode {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// A service instance registered on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentService {
    /// Service name. Several instances may share a name under different IDs.
    #[serde(rename = "Service", default)]
    pub service: String,
    /// Port the service listens on.
    #[serde(rename = "Port", default)]
    pub port: u16,
    /// Tags declared for this instance.
    #[serde(rename = "Tags", default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

impl AgentService {
    #[cfg(test)]
    pub fn new(service: impl Into<String>, port: u16) -> Self {
        Self {
            service: service.into(),
            port,
            tags: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Response of `GET /v1/catalog/node/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeServices {
    #[serde(rename = "Node")]
    pub node: CatalogNode,
    /// Services keyed by service ID.
    #[serde(rename = "Services", default, deserialize_with = "null_as_default")]
    pub services: BTreeMap<String, AgentService>,
}

impl NodeServices {
    #[cfg(test)]
    pub fn new(node: CatalogNode) -> Self {
        Self {
            node,
            services: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_service(mut self, service: AgentService) -> Self {
        self.services.insert(service.service.clone(), service);
        self
    }

    /// Iterate services as `(name, instance)`, falling back to the service ID
    /// when an instance carries no name.
    pub fn named_services(&self) -> impl Iterator<Item = (&str, &AgentService)> {
        self.services.iter().map(|(id, service)| {
            let name = if service.service.is_empty() {
                id.as_str()
            } else {
                service.service.as_str()
            };
            (name, service)
        })
    }
}

/// A single health check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Name of the node the check runs on.
    #[serde(rename = "Node", default)]
    pub node: String,
    /// Service the check belongs to; empty for node-level checks.
    #[serde(rename = "ServiceName", default)]
    pub service_name: String,
    /// `passing`, `warning`, `critical` or `maintenance`.
    #[serde(rename = "Status", default)]
    pub status: String,
}

impl HealthCheck {
    #[cfg(test)]
    pub fn new(
        node: impl Into<String>,
        service_name: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            service_name: service_name.into(),
            status: status.into(),
        }
    }

    pub fn is_passing(&self) -> bool {
        self.status == STATUS_PASSING
    }
}

/// One entry of `GET /v1/health/service/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    #[serde(rename = "Node")]
    pub node: CatalogNode,
    #[serde(rename = "Checks", default, deserialize_with = "null_as_default")]
    pub checks: Vec<HealthCheck>,
}

/// Consul renders empty collections as `null` in several endpoints.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
