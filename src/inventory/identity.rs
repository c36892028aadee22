//! Canonical host identity.

/// Compute the name a node is known by everywhere in the inventory.
///
/// With a DNS `domain` configured this is the Consul DNS name
/// `<node>.node[.<datacenter>].<domain>`, otherwise the node address.
/// Empty strings count as absent.
pub fn resolve(
    address: &str,
    node_name: &str,
    datacenter: Option<&str>,
    domain: Option<&str>,
) -> String {
    match domain.filter(|d| !d.is_empty()) {
        Some(domain) => match datacenter.filter(|dc| !dc.is_empty()) {
            Some(dc) => format!("{}.node.{}.{}", node_name, dc, domain),
            None => format!("{}.node.{}", node_name, domain),
        },
        None => address.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_without_domain() {
        assert_eq!(resolve("10.0.0.5", "web1", Some("dc1"), None), "10.0.0.5");
        assert_eq!(resolve("10.0.0.5", "web1", Some("dc1"), Some("")), "10.0.0.5");
    }

    #[test]
    fn test_dns_name_with_datacenter() {
        assert_eq!(
            resolve("10.0.0.5", "web1", Some("dc1"), Some("consul")),
            "web1.node.dc1.consul"
        );
    }

    #[test]
    fn test_dns_name_without_datacenter() {
        assert_eq!(
            resolve("10.0.0.5", "web1", None, Some("consul")),
            "web1.node.consul"
        );
        assert_eq!(
            resolve("10.0.0.5", "web1", Some(""), Some("consul")),
            "web1.node.consul"
        );
    }

    #[test]
    fn test_deterministic() {
        let first = resolve("10.0.0.5", "web1", Some("dc1"), Some("consul"));
        for _ in 0..3 {
            assert_eq!(resolve("10.0.0.5", "web1", Some("dc1"), Some("consul")), first);
        }
    }
}
