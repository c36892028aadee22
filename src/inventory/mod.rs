//! Inventory aggregation engine.
//!
//! Turns Consul catalog, health and KV data into an Ansible dynamic
//! inventory: groups of host identities plus per-host variables.
//!
//! The flow is driven by [`build_inventory`]: every node is handed to the
//! [`processor::NodeProcessor`], which resolves its identity and fills a
//! node-local [`processor::Collected`] (one [`groups::GroupCollector`] per
//! grouping dimension plus a [`metadata::MetadataAccumulator`]). Node results
//! are merged and passed to [`combiner::combine`], which deduplicates and
//! sorts everything into an [`InventoryDocument`].

pub mod build;
pub mod combiner;
pub mod groups;
pub mod identity;
pub mod kv;
pub mod metadata;
pub mod processor;
pub mod sanitize;

pub use build::{build_inventory, Scope};
pub use combiner::InventoryDocument;
pub use processor::InventorySettings;
