//! Per-node group and host variable derivation.

use super::groups::Groupings;
use super::identity::resolve;
use super::kv::{node_key, parse_group_list, parse_metadata};
use super::metadata::MetadataAccumulator;
use crate::consul::{DiscoveryClient, DiscoveryResult};
use crate::models::{AgentService, NodeServices};
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub const DEFAULT_AVAILABLE_SUFFIX: &str = "_available";
pub const DEFAULT_UNAVAILABLE_SUFFIX: &str = "_unavailable";

/// Engine options. Every optional feature is disabled by default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySettings {
    /// Consul DNS domain; when set hosts are named by DNS instead of address.
    pub domain: Option<String>,
    /// Appended to service names to form service group names.
    pub servers_suffix: Option<String>,
    /// Create `<service>_<tag>` groups and `consul_<service>_tags` variables.
    pub tags: bool,
    /// KV path holding comma separated group lists per node.
    pub kv_groups: Option<String>,
    /// KV path holding a JSON object of host variables per node.
    pub kv_metadata: Option<String>,
    /// Create service availability groups from health checks.
    pub availability: bool,
    pub available_suffix: Option<String>,
    pub unavailable_suffix: Option<String>,
}

impl InventorySettings {
    pub fn available_suffix(&self) -> &str {
        self.available_suffix
            .as_deref()
            .unwrap_or(DEFAULT_AVAILABLE_SUFFIX)
    }

    pub fn unavailable_suffix(&self) -> &str {
        self.unavailable_suffix
            .as_deref()
            .unwrap_or(DEFAULT_UNAVAILABLE_SUFFIX)
    }
}

/// Everything derived from one or more nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collected {
    pub groups: Groupings,
    pub metadata: MetadataAccumulator,
}

impl Collected {
    pub fn merge(&mut self, other: Collected) {
        self.groups.merge(other.groups);
        self.metadata.merge(other.metadata);
    }
}

/// Derives group memberships and host variables for single nodes.
pub struct NodeProcessor<'a, C: ?Sized> {
    client: &'a C,
    settings: &'a InventorySettings,
}

impl<'a, C: DiscoveryClient + ?Sized> NodeProcessor<'a, C> {
    pub fn new(client: &'a C, settings: &'a InventorySettings) -> Self {
        Self { client, settings }
    }

    /// Process the node `name` of `datacenter`.
    ///
    /// Returns `Ok(None)` if the catalog no longer knows the node. Catalog
    /// and health failures are returned as errors; KV failures are logged
    /// and skipped.
    pub async fn process(
        &self,
        name: &str,
        datacenter: &str,
        add_to_datacenter_group: bool,
    ) -> DiscoveryResult<Option<Collected>> {
        let Some(node) = self.client.node(name, datacenter).await? else {
            warn!("Node {} not found in datacenter {}, skipping", name, datacenter);
            return Ok(None);
        };

        let identity = resolve(
            &node.node.address,
            &node.node.name,
            Some(datacenter),
            self.settings.domain.as_deref(),
        );
        debug!("Processing node {} as {}", node.node.name, identity);

        let mut out = Collected::default();
        out.groups.all.add_member("all", &identity);
        if add_to_datacenter_group {
            out.groups.datacenters.add_member(datacenter, &identity);
        }
        out.metadata
            .set_scalar(&identity, "consul_datacenter", datacenter);
        out.metadata
            .set_scalar(&identity, "consul_nodename", node.node.name.as_str());

        self.load_groups_from_kv(&node, datacenter, &identity, &mut out)
            .await;
        self.load_metadata_from_kv(&node, datacenter, &identity, &mut out)
            .await;
        self.load_availability_groups(&node, datacenter, &identity, &mut out)
            .await?;

        for (service_name, service) in node.named_services() {
            self.load_service(service_name, service, &identity, &mut out);
        }

        Ok(Some(out))
    }

    async fn load_groups_from_kv(
        &self,
        node: &NodeServices,
        datacenter: &str,
        identity: &str,
        out: &mut Collected,
    ) {
        let Some(path) = self.settings.kv_groups.as_deref() else {
            return;
        };

        let key = node_key(path, datacenter, &node.node.name);
        if let Some(raw) = self.fetch_kv(&key, datacenter).await {
            for group in parse_group_list(&raw) {
                out.groups.kv.add_member(&group, identity);
            }
        }
    }

    async fn load_metadata_from_kv(
        &self,
        node: &NodeServices,
        datacenter: &str,
        identity: &str,
        out: &mut Collected,
    ) {
        let Some(path) = self.settings.kv_metadata.as_deref() else {
            return;
        };

        let key = node_key(path, datacenter, &node.node.name);
        let Some(raw) = self.fetch_kv(&key, datacenter).await else {
            return;
        };

        match parse_metadata(&raw) {
            Ok(entries) => {
                for (key, value) in entries {
                    out.metadata.set_scalar(identity, &key, value);
                }
            }
            // Unusable metadata contributes nothing.
            Err(e) => debug!("Ignoring metadata at {}: {}", key, e),
        }
    }

    async fn load_availability_groups(
        &self,
        node: &NodeServices,
        datacenter: &str,
        identity: &str,
        out: &mut Collected,
    ) -> DiscoveryResult<()> {
        if !self.settings.availability {
            return Ok(());
        }

        let services: Vec<&str> = node
            .named_services()
            .map(|(name, _)| name)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if services.is_empty() {
            return Ok(());
        }

        let checks = self
            .client
            .node_health(&node.node.name, &services, datacenter)
            .await?;

        for service in &services {
            for check in checks.iter().filter(|c| c.service_name == *service) {
                let suffix = if check.is_passing() {
                    self.settings.available_suffix()
                } else {
                    self.settings.unavailable_suffix()
                };
                out.groups
                    .availability
                    .add_member(&format!("{}{}", service, suffix), identity);
            }
        }

        Ok(())
    }

    fn load_service(
        &self,
        service_name: &str,
        service: &AgentService,
        identity: &str,
        out: &mut Collected,
    ) {
        out.metadata
            .append_list(identity, "consul_services", service_name);

        if service_name.eq_ignore_ascii_case("ssh") {
            out.metadata
                .set_scalar(identity, "ansible_ssh_port", service.port);
        }

        let group = match self.settings.servers_suffix.as_deref() {
            Some(suffix) => format!("{}{}", service_name, suffix),
            None => service_name.to_string(),
        };
        out.groups.services.add_member(&group, identity);

        if self.settings.tags && !service.tags.is_empty() {
            out.metadata.set_scalar(
                identity,
                &format!("consul_{}_tags", group),
                service.tags.clone(),
            );
            for tag in &service.tags {
                out.groups
                    .tags
                    .add_member(&format!("{}_{}", group, tag), identity);
            }
        }
    }

    /// Read a KV value, treating backend failures like a missing key.
    async fn fetch_kv(&self, key: &str, datacenter: &str) -> Option<Vec<u8>> {
        match self.client.kv_get(key, datacenter).await {
            Ok(value) => value,
            Err(e) => {
                warn!("KV lookup for {} failed, skipping: {}", key, e);
                None
            }
        }
    }
}
