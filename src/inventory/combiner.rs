//! Final inventory assembly.

use super::groups::GroupCollector;
use super::metadata::{HostMetadata, MetadataAccumulator};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Reserved top-level key carrying host variables.
pub const META_KEY: &str = "_meta";

/// The `_meta` entry of an inventory.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct InventoryMeta {
    pub hostvars: BTreeMap<String, HostMetadata>,
}

/// A complete Ansible dynamic inventory.
///
/// Serializes as a single JSON object mapping group names to sorted member
/// lists, with `_meta.hostvars` in its sorted position among the groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryDocument {
    groups: BTreeMap<String, Vec<String>>,
    meta: InventoryMeta,
}

impl InventoryDocument {
    pub fn groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.groups
    }

    #[cfg(test)]
    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    pub fn hostvars(&self) -> &BTreeMap<String, HostMetadata> {
        &self.meta.hostvars
    }

    /// Render with 2-space indentation and a trailing newline.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut output = serde_json::to_string_pretty(self)?;
        output.push('\n');
        Ok(output)
    }
}

impl Serialize for InventoryDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len() + 1))?;
        let mut meta_written = false;

        for (name, members) in &self.groups {
            if !meta_written && name.as_str() > META_KEY {
                map.serialize_entry(META_KEY, &self.meta)?;
                meta_written = true;
            }
            map.serialize_entry(name, members)?;
        }
        if !meta_written {
            map.serialize_entry(META_KEY, &self.meta)?;
        }

        map.end()
    }
}

/// Union every grouping dimension into one inventory.
///
/// Groups with the same name from different dimensions are merged; members
/// are deduplicated and sorted.
pub fn combine<I>(dimensions: I, metadata: MetadataAccumulator) -> InventoryDocument
where
    I: IntoIterator<Item = GroupCollector>,
{
    let mut merged: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for dimension in dimensions {
        for (name, members) in dimension {
            if name == META_KEY {
                warn!("Dropping group named {}, it clashes with host variables", META_KEY);
                continue;
            }
            merged.entry(name).or_default().extend(members);
        }
    }

    InventoryDocument {
        groups: merged
            .into_iter()
            .map(|(name, members)| (name, members.into_iter().collect()))
            .collect(),
        meta: InventoryMeta {
            hostvars: metadata.into_hostvars(),
        },
    }
}
