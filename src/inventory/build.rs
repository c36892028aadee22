//! Inventory run driver: walks datacenters and nodes, then combines.

use super::combiner::{combine, InventoryDocument};
use super::processor::{Collected, InventorySettings, NodeProcessor};
use crate::consul::{DiscoveryClient, DiscoveryResult};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

/// Which part of the catalog to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every node of every datacenter.
    All,
    /// Every node of one datacenter.
    Datacenter(String),
    /// A single node.
    Host { datacenter: String, node: String },
}

/// Build the inventory for `scope`.
///
/// Nodes of a datacenter are processed up to `concurrency` at a time and
/// merged in catalog order. The first catalog or health failure aborts the
/// run.
pub async fn build_inventory<C>(
    client: &C,
    settings: &InventorySettings,
    scope: &Scope,
    concurrency: usize,
) -> DiscoveryResult<InventoryDocument>
where
    C: DiscoveryClient + ?Sized,
{
    let processor = NodeProcessor::new(client, settings);
    let mut collected = Collected::default();

    match scope {
        Scope::All => {
            let datacenters = client.datacenters().await?;
            info!("Found {} datacenters", datacenters.len());
            for datacenter in &datacenters {
                let dc = load_datacenter(&processor, client, datacenter, concurrency).await?;
                collected.merge(dc);
            }
        }
        Scope::Datacenter(datacenter) => {
            collected = load_datacenter(&processor, client, datacenter, concurrency).await?;
        }
        Scope::Host { datacenter, node } => {
            if let Some(out) = processor.process(node, datacenter, false).await? {
                collected = out;
            }
        }
    }

    Ok(combine(
        collected.groups.into_dimensions(),
        collected.metadata,
    ))
}

async fn load_datacenter<C>(
    processor: &NodeProcessor<'_, C>,
    client: &C,
    datacenter: &str,
    concurrency: usize,
) -> DiscoveryResult<Collected>
where
    C: DiscoveryClient + ?Sized,
{
    let nodes = client.nodes(datacenter).await?;
    info!("Processing {} nodes in datacenter {}", nodes.len(), datacenter);

    let results: Vec<Option<Collected>> = stream::iter(nodes)
        .map(|node| async move { processor.process(&node.name, datacenter, true).await })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut collected = Collected::default();
    for out in results.into_iter().flatten() {
        collected.merge(out);
    }
    debug!("Finished datacenter {}", datacenter);

    Ok(collected)
}
