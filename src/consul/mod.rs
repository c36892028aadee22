//! Consul discovery client.
//!
//! The inventory engine only talks to Consul through the [`DiscoveryClient`]
//! trait, so it can run against the HTTP API or an in-memory fixture.

mod client;
mod error;
#[cfg(test)]
mod memory;

pub use client::{ConsulClient, ConsulClientConfig};
pub use error::{DiscoveryError, DiscoveryResult};
#[cfg(test)]
pub use memory::MemoryDiscovery;

use crate::models::{CatalogNode, HealthCheck, NodeServices, ServiceHealth};
use async_trait::async_trait;

/// Read-only view of the Consul catalog, health and KV endpoints.
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// Lists every known datacenter.
    async fn datacenters(&self) -> DiscoveryResult<Vec<String>>;

    /// Lists the nodes registered in a datacenter.
    async fn nodes(&self, datacenter: &str) -> DiscoveryResult<Vec<CatalogNode>>;

    /// Fetches a node and its registered services.
    ///
    /// Returns `Ok(None)` when the catalog does not know the node.
    async fn node(&self, name: &str, datacenter: &str) -> DiscoveryResult<Option<NodeServices>>;

    /// Lists the health of every instance of a service.
    async fn service_health(
        &self,
        service: &str,
        datacenter: &str,
    ) -> DiscoveryResult<Vec<ServiceHealth>>;

    /// Returns the health checks attached to a single node.
    ///
    /// The default implementation queries each of the node's services and
    /// keeps the entries that belong to `node`. Every such entry repeats the
    /// node-level checks, so those are kept once. Clients with a node-scoped
    /// endpoint should override it.
    async fn node_health(
        &self,
        node: &str,
        services: &[&str],
        datacenter: &str,
    ) -> DiscoveryResult<Vec<HealthCheck>> {
        let mut checks = Vec::new();
        for service in services {
            for entry in self.service_health(service, datacenter).await? {
                if entry.node.name != node {
                    continue;
                }
                for check in entry.checks {
                    let node_level = check.service_name.is_empty();
                    if (node_level && !checks.contains(&check))
                        || (!node_level && check.service_name == *service)
                    {
                        checks.push(check);
                    }
                }
            }
        }
        Ok(checks)
    }

    /// Reads a raw value from the KV store. `Ok(None)` when the key is absent.
    async fn kv_get(&self, key: &str, datacenter: &str) -> DiscoveryResult<Option<Vec<u8>>>;
}
