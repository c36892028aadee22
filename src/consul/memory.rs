//! In-memory discovery client for tests.

use super::{DiscoveryClient, DiscoveryError, DiscoveryResult};
use crate::models::{CatalogNode, HealthCheck, NodeServices, ServiceHealth};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A fixture-backed [`DiscoveryClient`].
///
/// Nodes are listed in insertion order per datacenter. Health checks are
/// served through `service_health`, so the trait's default `node_health`
/// is what callers exercise.
#[derive(Debug, Default)]
pub struct MemoryDiscovery {
    datacenters: Vec<String>,
    nodes: BTreeMap<String, Vec<NodeServices>>,
    checks: Vec<HealthCheck>,
    kv: HashMap<String, Vec<u8>>,
    failing_kv: HashSet<String>,
    failing_datacenters: HashSet<String>,
    kv_reads: AtomicUsize,
}

impl MemoryDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, datacenter: &str, node: NodeServices) -> Self {
        if !self.datacenters.iter().any(|dc| dc == datacenter) {
            self.datacenters.push(datacenter.to_string());
        }
        self.nodes
            .entry(datacenter.to_string())
            .or_default()
            .push(node);
        self
    }

    pub fn with_check(mut self, check: HealthCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_kv(mut self, key: &str, value: impl Into<Vec<u8>>) -> Self {
        self.kv.insert(key.to_string(), value.into());
        self
    }

    /// Make reads of `key` fail with a backend error.
    pub fn with_failing_kv(mut self, key: &str) -> Self {
        self.failing_kv.insert(key.to_string());
        self
    }

    /// Make node listing for `datacenter` fail with a backend error.
    pub fn with_failing_datacenter(mut self, datacenter: &str) -> Self {
        self.failing_datacenters.insert(datacenter.to_string());
        self
    }

    pub fn kv_reads(&self) -> usize {
        self.kv_reads.load(Ordering::SeqCst)
    }

    fn find_node(&self, datacenter: &str, name: &str) -> Option<&NodeServices> {
        self.nodes
            .get(datacenter)?
            .iter()
            .find(|n| n.node.name == name)
    }

    fn backend_error(url: String) -> DiscoveryError {
        DiscoveryError::Status {
            status: 500,
            url,
            body: "rpc error".to_string(),
        }
    }
}

#[async_trait]
impl DiscoveryClient for MemoryDiscovery {
    async fn datacenters(&self) -> DiscoveryResult<Vec<String>> {
        Ok(self.datacenters.clone())
    }

    async fn nodes(&self, datacenter: &str) -> DiscoveryResult<Vec<CatalogNode>> {
        if self.failing_datacenters.contains(datacenter) {
            return Err(Self::backend_error(format!("memory://catalog/nodes?dc={}", datacenter)));
        }

        Ok(self
            .nodes
            .get(datacenter)
            .map(|nodes| nodes.iter().map(|n| n.node.clone()).collect())
            .unwrap_or_default())
    }

    async fn node(&self, name: &str, datacenter: &str) -> DiscoveryResult<Option<NodeServices>> {
        Ok(self.find_node(datacenter, name).cloned())
    }

    async fn service_health(
        &self,
        service: &str,
        datacenter: &str,
    ) -> DiscoveryResult<Vec<ServiceHealth>> {
        let Some(nodes) = self.nodes.get(datacenter) else {
            return Ok(Vec::new());
        };

        let entries = nodes
            .iter()
            .filter(|n| n.named_services().any(|(name, _)| name == service))
            .map(|n| ServiceHealth {
                node: n.node.clone(),
                checks: self
                    .checks
                    .iter()
                    .filter(|c| c.node == n.node.name)
                    .cloned()
                    .collect(),
            })
            .collect();

        Ok(entries)
    }

    async fn kv_get(&self, key: &str, _datacenter: &str) -> DiscoveryResult<Option<Vec<u8>>> {
        self.kv_reads.fetch_add(1, Ordering::SeqCst);

        if self.failing_kv.contains(key) {
            return Err(Self::backend_error(format!("memory://kv/{}", key)));
        }
        Ok(self.kv.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentService;

    fn fixture() -> MemoryDiscovery {
        MemoryDiscovery::new()
            .with_node(
                "dc1",
                NodeServices::new(CatalogNode::new("web1", "10.0.0.5"))
                    .with_service(AgentService::new("nginx", 80)),
            )
            .with_node(
                "dc1",
                NodeServices::new(CatalogNode::new("web2", "10.0.0.6"))
                    .with_service(AgentService::new("nginx", 80)),
            )
            .with_check(HealthCheck::new("web1", "nginx", "passing"))
            .with_check(HealthCheck::new("web2", "nginx", "critical"))
    }

    #[test]
    fn test_default_node_health_filters_by_node() {
        let client = fixture();
        let checks = tokio_test::block_on(client.node_health("web2", &["nginx"], "dc1")).unwrap();
        assert_eq!(checks, vec![HealthCheck::new("web2", "nginx", "critical")]);
    }

    #[test]
    fn test_default_node_health_reports_each_check_once() {
        let client = MemoryDiscovery::new()
            .with_node(
                "dc1",
                NodeServices::new(CatalogNode::new("app1", "10.0.0.7"))
                    .with_service(AgentService::new("nginx", 80))
                    .with_service(AgentService::new("redis", 6379)),
            )
            .with_check(HealthCheck::new("app1", "", "passing"))
            .with_check(HealthCheck::new("app1", "nginx", "passing"))
            .with_check(HealthCheck::new("app1", "redis", "critical"));

        let checks =
            tokio_test::block_on(client.node_health("app1", &["nginx", "redis"], "dc1")).unwrap();
        assert_eq!(
            checks,
            vec![
                HealthCheck::new("app1", "", "passing"),
                HealthCheck::new("app1", "nginx", "passing"),
                HealthCheck::new("app1", "redis", "critical"),
            ]
        );
    }

    #[test]
    fn test_unknown_node_and_datacenter() {
        let client = fixture();
        assert!(tokio_test::block_on(client.node("db1", "dc1")).unwrap().is_none());
        assert!(tokio_test::block_on(client.nodes("dc9")).unwrap().is_empty());
    }
}
