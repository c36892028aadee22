//! consul-inventory - Ansible dynamic inventory from a Consul cluster
//!
//! Reads nodes, services, health checks and KV entries from the Consul
//! HTTP API and prints an Ansible inventory document on stdout.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, connection, Consul API failure)

mod cli;
mod config;
mod consul;
mod inventory;
mod models;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use consul::ConsulClient;
use inventory::{build_inventory, Scope};
use std::io::Write;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("consul-inventory v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    if !args.list && args.host.is_none() {
        debug!("No mode given, listing the full inventory");
    }

    match run_inventory(args).await {
        Ok(output) => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(output.as_bytes())
                .and_then(|_| stdout.flush())
                .context("Failed to write inventory to stdout")?;
            Ok(())
        }
        Err(e) => {
            error!("Inventory failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default consul.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    eprintln!("Created {} with default settings.", CONFIG_FILE_NAME);
    Ok(())
}

/// Initialize logging on stderr; stdout is reserved for the inventory.
///
/// `RUST_LOG` overrides the level chosen by `--verbose`/`--quiet`.
fn init_logging(args: &Args) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Build the inventory and render it as JSON.
async fn run_inventory(args: Args) -> Result<String> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let scope = config.scope();
    let settings = config.inventory_settings();
    debug!("Scope: {:?}, settings: {:?}", scope, settings);

    let client = ConsulClient::new(config.client_config())
        .context("Failed to create Consul client")?;
    info!("Querying Consul at {}", config.consul.url);

    let document = build_inventory(&client, &settings, &scope, config.general.concurrency)
        .await
        .with_context(|| match &scope {
            Scope::All => "Failed to load inventory from Consul".to_string(),
            Scope::Datacenter(dc) => format!("Failed to load inventory for datacenter {}", dc),
            Scope::Host { datacenter, node } => {
                format!("Failed to load node {} in datacenter {}", node, datacenter)
            }
        })?;

    info!(
        "Built inventory with {} groups and {} hosts in {:.2}s",
        document.groups().len(),
        document.hostvars().len(),
        start_time.elapsed().as_secs_f64()
    );

    document
        .to_json_pretty()
        .context("Failed to serialize inventory")
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default locations
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
