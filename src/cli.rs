//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// consul-inventory - Ansible dynamic inventory from Consul
///
/// Groups nodes by datacenter, registered service, service tags,
/// service health and values from the KV store, and prints the
/// inventory as JSON on stdout.
///
/// Examples:
///   consul-inventory --list
///   consul-inventory --datacenter dc1
///   consul-inventory --datacenter dc1 --host web1
///   consul-inventory --url http://consul.internal:8500 --domain consul
///   consul-inventory --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// List the inventory of every node (default action)
    #[arg(long)]
    pub list: bool,

    /// Only include this node
    ///
    /// Requires a datacenter, from --datacenter or the config file.
    #[arg(long, value_name = "NODE")]
    pub host: Option<String>,

    /// Only include nodes from this datacenter
    #[arg(long, value_name = "DC")]
    pub datacenter: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for consul.toml in the current directory,
    /// then next to the executable
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Consul HTTP API address
    #[arg(long, value_name = "URL", env = "CONSUL_HTTP_ADDR")]
    pub url: Option<String>,

    /// ACL token used for catalog and KV reads
    #[arg(long, value_name = "TOKEN", env = "CONSUL_HTTP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Consul DNS domain used to name hosts instead of their address
    #[arg(long, value_name = "DOMAIN")]
    pub domain: Option<String>,

    /// Enable verbose logging output (stderr)
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default consul.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.url {
            if url.trim().is_empty() {
                return Err("Consul URL must not be empty".to_string());
            }
        }

        if matches!(self.host.as_deref(), Some("")) {
            return Err("--host must not be empty".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// Inventory runs are quiet by default so only the JSON document is
    /// visible to the caller.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        }
    }
}
