//! Per-host metadata (Ansible host variables).

use super::sanitize::sanitize;
use serde::Serialize;
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// A single host variable.
///
/// `List` values are built up one element at a time with
/// [`MetadataAccumulator::append_list`]; everything else is a `Scalar`,
/// which may itself be any JSON value (service tags are stored as one
/// scalar array).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Scalar(Value),
    List(Vec<Value>),
}

impl MetaValue {
    fn push(&mut self, value: Value) {
        match self {
            MetaValue::List(items) => items.push(value),
            MetaValue::Scalar(existing) => {
                let previous = std::mem::take(existing);
                *self = MetaValue::List(vec![previous, value]);
            }
        }
    }
}

/// Variables of one host, keyed by sanitized name.
pub type HostMetadata = BTreeMap<String, MetaValue>;

/// Collects host variables for every host seen during a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataAccumulator {
    hosts: BTreeMap<String, HostMetadata>,
    /// `(host, key)` pairs whose value no longer depends on anything written
    /// before this accumulator, because a scalar was set on them.
    replaced: BTreeSet<(String, String)>,
}

impl MetadataAccumulator {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` on `host`, replacing any previous value.
    pub fn set_scalar(&mut self, host: &str, key: &str, value: impl Into<Value>) {
        let key = sanitize(key);
        self.replaced.insert((host.to_string(), key.clone()));
        self.host_entry(host)
            .insert(key, MetaValue::Scalar(value.into()));
    }

    /// Append `value` to the list stored under `key` on `host`, starting a
    /// new list if the key is unset.
    pub fn append_list(&mut self, host: &str, key: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.host_entry(host).entry(sanitize(key)) {
            Entry::Occupied(mut entry) => entry.get_mut().push(value),
            Entry::Vacant(entry) => {
                entry.insert(MetaValue::List(vec![value]));
            }
        }
    }

    /// Fold another accumulator into this one as if its writes had been
    /// applied here afterwards. Keys `other` set a scalar on overwrite;
    /// keys it only appended to extend the existing value.
    pub fn merge(&mut self, other: MetadataAccumulator) {
        let MetadataAccumulator { hosts, replaced } = other;

        for (host, entries) in hosts {
            let target = self.hosts.entry(host.clone()).or_default();
            for (key, value) in entries {
                let overwrite = replaced.contains(&(host.clone(), key.clone()));
                match (target.entry(key), value) {
                    (Entry::Occupied(mut entry), MetaValue::List(items)) if !overwrite => {
                        for item in items {
                            entry.get_mut().push(item);
                        }
                    }
                    (Entry::Occupied(mut entry), value) => {
                        entry.insert(value);
                    }
                    (Entry::Vacant(entry), value) => {
                        entry.insert(value);
                    }
                }
            }
        }

        self.replaced.extend(replaced);
    }

    #[cfg(test)]
    /// Variables recorded for `host`, if any.
    pub fn host(&self, host: &str) -> Option<&HostMetadata> {
        self.hosts.get(host)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn into_hostvars(self) -> BTreeMap<String, HostMetadata> {
        self.hosts
    }

    fn host_entry(&mut self, host: &str) -> &mut HostMetadata {
        self.hosts.entry(host.to_string()).or_default()
    }
}
