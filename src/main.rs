//! # qdb-batchd
//!
//! Reference server for the batch client. It keeps entries in memory or in
//! sled and answers one batch per request line.
//!
//! ## Configuration Priority
//! 1. Command line arguments (highest priority)
//! 2. `QDB_*` environment variables
//! 3. Configuration file (config.toml)
//! 4. Default values (lowest priority)

use anyhow::Result;
use clap::Parser;
use log::info;
use qdb_client::config::{EngineKind, ServerConfig};
use qdb_client::server::{open_engine, Server};
use qdb_client::store::Store;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "qdb-batchd", version, about = "Batch-operation reference server")]
struct Args {
    /// Path to configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Storage engine: "memory" or "sled"
    #[arg(long)]
    engine: Option<EngineKind>,

    /// Storage path for the sled engine
    #[arg(long)]
    storage_path: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=debug
    env_logger::init();

    let args = Args::parse();
    let mut config = ServerConfig::load_or_default(&args.config)?;

    if let Some(engine) = args.engine {
        config.engine = engine;
    }
    if let Some(path) = args.storage_path {
        config.storage_path = path;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    match config.engine {
        EngineKind::Memory => info!("Using in-memory engine"),
        EngineKind::Sled => info!("Using persistent sled engine at {}", config.storage_path),
    }
    if !config.disabled_operations.is_empty() {
        info!("Disabled operations: {:?}", config.disabled_operations);
    }

    let store = Store::new(open_engine(&config)?).with_disabled(config.disabled_operations.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let server = Server::bind(&config, store).await?;
        server.run().await
    })
}
