//! Configuration file handling.
//!
//! This module handles loading `consul.toml` and merging it with
//! command-line arguments.

use crate::cli::Args;
use crate::consul::ConsulClientConfig;
use crate::inventory::{InventorySettings, Scope};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "consul.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Consul connection and inventory settings.
    #[serde(default)]
    pub consul: ConsulConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Number of nodes processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// Consul settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsulConfig {
    /// Agent HTTP API URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// ACL token for catalog and KV access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Restrict the inventory to one datacenter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,

    /// Restrict the inventory to one node (needs `datacenter`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Consul DNS domain; hosts are named `<node>.node.<dc>.<domain>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Suffix appended to service group names, e.g. `_servers`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers_suffix: Option<String>,

    /// Create `<service>_<tag>` groups.
    #[serde(default)]
    pub tags: bool,

    /// KV path holding comma separated groups per `<dc>/<node>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kv_groups: Option<String>,

    /// KV path holding a JSON object of host variables per `<dc>/<node>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kv_metadata: Option<String>,

    /// Create availability groups from service health.
    #[serde(default)]
    pub availability: bool,

    #[serde(default = "default_available_suffix")]
    pub available_suffix: String,

    #[serde(default = "default_unavailable_suffix")]
    pub unavailable_suffix: String,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_seconds: default_timeout(),
            token: None,
            datacenter: None,
            host: None,
            domain: None,
            servers_suffix: None,
            tags: false,
            kv_groups: None,
            kv_metadata: None,
            availability: false,
            available_suffix: default_available_suffix(),
            unavailable_suffix: default_unavailable_suffix(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:8500".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_available_suffix() -> String {
    "_available".to_string()
}

fn default_unavailable_suffix() -> String {
    "_unavailable".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default locations: the current
    /// directory, then the directory holding the executable.
    ///
    /// Returns `Ok(None)` if no file exists, `Err` if one exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        for path in default_paths() {
            if path.exists() {
                return Ok(Some(Self::load(&path)?));
            }
        }
        Ok(None)
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref url) = args.url {
            self.consul.url = url.clone();
        }
        if let Some(ref token) = args.token {
            self.consul.token = Some(token.clone());
        }
        if let Some(ref datacenter) = args.datacenter {
            self.consul.datacenter = Some(datacenter.clone());
        }
        if let Some(ref host) = args.host {
            self.consul.host = Some(host.clone());
        }
        if let Some(ref domain) = args.domain {
            self.consul.domain = Some(domain.clone());
        }

        self.consul.url = normalize_url(&self.consul.url);
    }

    /// Check settings that only make sense together.
    pub fn validate(&self) -> Result<()> {
        if non_empty(&self.consul.host).is_some() && non_empty(&self.consul.datacenter).is_none() {
            bail!("--host requires a datacenter (set --datacenter or `datacenter` in the config)");
        }
        if !self.consul.url.starts_with("http://") && !self.consul.url.starts_with("https://") {
            bail!("Consul URL must use http:// or https://: {}", self.consul.url);
        }
        if self.consul.timeout_seconds == 0 {
            bail!("timeout_seconds must be at least 1");
        }
        Ok(())
    }

    /// Which part of the catalog this run covers.
    pub fn scope(&self) -> Scope {
        match (
            non_empty(&self.consul.datacenter),
            non_empty(&self.consul.host),
        ) {
            (Some(dc), Some(host)) => Scope::Host {
                datacenter: dc.to_string(),
                node: host.to_string(),
            },
            (Some(dc), None) => Scope::Datacenter(dc.to_string()),
            _ => Scope::All,
        }
    }

    /// Engine settings; empty strings disable the matching feature.
    pub fn inventory_settings(&self) -> InventorySettings {
        let owned = |value: &Option<String>| non_empty(value).map(String::from);

        InventorySettings {
            domain: owned(&self.consul.domain),
            servers_suffix: owned(&self.consul.servers_suffix),
            tags: self.consul.tags,
            kv_groups: owned(&self.consul.kv_groups),
            kv_metadata: owned(&self.consul.kv_metadata),
            availability: self.consul.availability,
            available_suffix: owned(&Some(self.consul.available_suffix.clone())),
            unavailable_suffix: owned(&Some(self.consul.unavailable_suffix.clone())),
        }
    }

    /// Connection settings for the HTTP client.
    pub fn client_config(&self) -> ConsulClientConfig {
        ConsulClientConfig {
            url: self.consul.url.clone(),
            token: self.consul.token.clone(),
            timeout_seconds: self.consul.timeout_seconds,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    paths
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// `CONSUL_HTTP_ADDR` is commonly given as `host:port`; assume plain HTTP.
fn normalize_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args() -> Args {
        Args {
            list: true,
            host: None,
            datacenter: None,
            config: None,
            url: None,
            token: None,
            domain: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.consul.url, "http://localhost:8500");
        assert_eq!(config.general.concurrency, 4);
        assert!(!config.consul.tags);
        assert!(!config.consul.availability);
        assert_eq!(config.scope(), Scope::All);
        assert_eq!(config.inventory_settings().available_suffix(), "_available");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
concurrency = 8

[consul]
url = "http://consul.internal:8500"
datacenter = "dc1"
domain = "consul"
servers_suffix = "_servers"
tags = true
kv_groups = "ansible/groups"
kv_metadata = "ansible/metadata"
availability = true
available_suffix = "_up"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.concurrency, 8);
        assert_eq!(config.consul.url, "http://consul.internal:8500");
        assert_eq!(config.scope(), Scope::Datacenter("dc1".to_string()));

        let settings = config.inventory_settings();
        assert_eq!(settings.domain.as_deref(), Some("consul"));
        assert_eq!(settings.servers_suffix.as_deref(), Some("_servers"));
        assert!(settings.tags);
        assert!(settings.availability);
        assert_eq!(settings.kv_groups.as_deref(), Some("ansible/groups"));
        assert_eq!(settings.available_suffix(), "_up");
        assert_eq!(settings.unavailable_suffix(), "_unavailable");
    }

    #[test]
    fn test_empty_values_disable_features() {
        let config: Config = toml::from_str(
            r#"
[consul]
domain = ""
kv_groups = ""
"#,
        )
        .unwrap();
        let settings = config.inventory_settings();
        assert!(settings.domain.is_none());
        assert!(settings.kv_groups.is_none());
    }

    #[test]
    fn test_empty_availability_suffix_falls_back_to_default() {
        let config: Config = toml::from_str(
            r#"
[consul]
availability = true
available_suffix = ""
unavailable_suffix = ""
"#,
        )
        .unwrap();
        let settings = config.inventory_settings();
        assert!(settings.available_suffix.is_none());
        assert_eq!(settings.available_suffix(), "_available");
        assert_eq!(settings.unavailable_suffix(), "_unavailable");
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        config.consul.datacenter = Some("dc1".to_string());

        let mut cli = args();
        cli.url = Some("127.0.0.1:8500".to_string());
        cli.host = Some("web1".to_string());
        cli.token = Some("secret".to_string());
        config.merge_with_args(&cli);

        assert_eq!(config.consul.url, "http://127.0.0.1:8500");
        assert_eq!(config.consul.token.as_deref(), Some("secret"));
        assert_eq!(
            config.scope(),
            Scope::Host {
                datacenter: "dc1".to_string(),
                node: "web1".to_string(),
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_host_requires_datacenter() {
        let mut config = Config::default();
        let mut cli = args();
        cli.host = Some("web1".to_string());
        config.merge_with_args(&cli);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("datacenter"));
    }

    #[test]
    fn test_rejects_unsupported_scheme() {
        let mut config = Config::default();
        config.consul.url = "ftp://consul:8500".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[consul]\ntags = true\ndatacenter = \"east\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(config.consul.tags);
        assert_eq!(config.consul.datacenter.as_deref(), Some("east"));
        assert_eq!(config.consul.available_suffix, "_available");
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[consul\ntags = ").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[consul]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.consul.url, "http://localhost:8500");
    }
}
