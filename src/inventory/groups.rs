//! Group membership collection.

use super::sanitize::sanitize;
use std::collections::BTreeMap;

/// Named lists of host identities for one grouping dimension.
///
/// Members are kept in insertion order and may repeat; the combiner
/// deduplicates and sorts them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupCollector {
    groups: BTreeMap<String, Vec<String>>,
}

impl GroupCollector {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `host` to the group `name` (sanitized), creating it if needed.
    pub fn add_member(&mut self, name: &str, host: &str) {
        self.groups
            .entry(sanitize(name))
            .or_default()
            .push(host.to_string());
    }

    /// Append every membership recorded in `other`.
    pub fn merge(&mut self, other: GroupCollector) {
        for (name, members) in other.groups {
            self.groups.entry(name).or_default().extend(members);
        }
    }

    #[cfg(test)]
    pub fn members(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    #[cfg(test)]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl IntoIterator for GroupCollector {
    type Item = (String, Vec<String>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// One collector per grouping dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Groupings {
    /// The implicit `all` group.
    pub all: GroupCollector,
    pub datacenters: GroupCollector,
    pub services: GroupCollector,
    pub tags: GroupCollector,
    /// Groups read from the KV store.
    pub kv: GroupCollector,
    pub availability: GroupCollector,
}

impl Groupings {
    pub fn merge(&mut self, other: Groupings) {
        self.all.merge(other.all);
        self.datacenters.merge(other.datacenters);
        self.services.merge(other.services);
        self.tags.merge(other.tags);
        self.kv.merge(other.kv);
        self.availability.merge(other.availability);
    }

    /// Every dimension, in combine order.
    pub fn into_dimensions(self) -> [GroupCollector; 6] {
        [
            self.all,
            self.datacenters,
            self.services,
            self.tags,
            self.kv,
            self.availability,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_member_creates_group_lazily() {
        let mut groups = GroupCollector::new();
        assert!(groups.is_empty());
        assert!(groups.members("redis").is_none());

        groups.add_member("redis", "10.0.0.5");
        assert_eq!(groups.members("redis"), Some(&["10.0.0.5".to_string()][..]));
    }

    #[test]
    fn test_group_names_sanitized() {
        let mut groups = GroupCollector::new();
        groups.add_member("redis main", "10.0.0.5");
        groups.add_member("web/v2", "10.0.0.5");

        let names: Vec<&str> = groups.names().collect();
        assert_eq!(names, vec!["redis_main", "web_v2"]);
    }

    #[test]
    fn test_duplicates_kept_until_combine() {
        let mut groups = GroupCollector::new();
        groups.add_member("nginx_available", "10.0.0.5");
        groups.add_member("nginx_available", "10.0.0.5");
        assert_eq!(groups.members("nginx_available").map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_merge_appends() {
        let mut first = GroupCollector::new();
        first.add_member("dc1", "10.0.0.5");
        let mut second = GroupCollector::new();
        second.add_member("dc1", "10.0.0.6");
        second.add_member("dc2", "10.0.1.1");

        first.merge(second);
        assert_eq!(
            first.members("dc1"),
            Some(&["10.0.0.5".to_string(), "10.0.0.6".to_string()][..])
        );
        assert_eq!(first.members("dc2").map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_groupings_merge_per_dimension() {
        let mut left = Groupings::default();
        left.all.add_member("all", "a");
        let mut right = Groupings::default();
        right.all.add_member("all", "b");
        right.tags.add_member("redis_main", "b");

        left.merge(right);
        assert_eq!(left.all.members("all").map(|m| m.len()), Some(2));
        assert!(left.services.is_empty());
        assert!(left.tags.members("redis_main").is_some());
    }
}
