//! Land Registry CLI
//!
//! ## Usage
//!
//! ```bash
//! # Submit a claim
//! land-registry submit --khasra 112/4 --owner "Meena Sahu" --district Raipur --village Kurud --area 1200
//!
//! # Search
//! land-registry search --district Raipur --village kur --status pending
//!
//! # Council review
//! land-registry login --id COUNCIL2025 --password admin@123 --member "Nisha Toppo"
//! land-registry approve 1
//! land-registry dispute 2
//!
//! # Custom storage directory
//! land-registry --storage-dir /data/registry stats
//! ```

mod cli;

use anyhow::Result;
use clap::Parser;
use land_registry::events::spawn_logging_listener;
use land_registry::{Config, EventBus, KeyValueStore, SledStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Commands, Registry};

#[derive(Parser, Debug)]
#[command(name = "land-registry")]
#[command(about = "Land parcel registry with council approval")]
struct Cli {
    /// Path to config file
    #[arg(short, long, env = "LAND_REGISTRY_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long, env = "LAND_REGISTRY_DIR")]
    storage_dir: Option<PathBuf>,

    /// Approvals required before a parcel reads as approved
    #[arg(long)]
    required_approvals: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("land_registry=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load config (explicit file, else config.toml in the storage dir)
    let mut config = Config::resolve(cli.config.as_deref(), cli.storage_dir)?;

    // Apply CLI overrides
    if let Some(required) = cli.required_approvals {
        config.required_approvals = required;
    }

    std::fs::create_dir_all(&config.storage_dir)?;

    // Save default config if it doesn't exist
    let config_path = config.config_path();
    if cli.config.is_none() && !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    let backend: Arc<dyn KeyValueStore> = Arc::new(SledStore::open(config.db_path())?);
    let events = Arc::new(EventBus::new());
    let listener = spawn_logging_listener(events.clone());
    let mut registry = Registry::new(backend, &config, events);

    let result = cli::execute(&mut registry, cli.command);

    // Dropping the last bus handle closes it; the listener logs what is
    // queued and exits
    drop(registry);
    listener.await?;

    result
}
