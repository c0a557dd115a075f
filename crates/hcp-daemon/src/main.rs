// crates/hcp-daemon/src/main.rs
//
// Binary entrypoint for the HCP telemetry server.
//
// Parses CLI arguments, loads configuration, initializes tracing, opens the
// RocksDB store and serves JSON-RPC until Ctrl-C.

mod config;

use std::sync::Arc;

use clap::Parser;
use config::ServerConfig;

use hcp_rpc::{HcpRpcServer, SharedStore};
use hcp_store::RocksStore;

/// HCP telemetry and transaction data server.
#[derive(Parser, Debug)]
#[command(name = "hcp-server", version, about = "HCP telemetry and transaction data server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.hcp/config.toml")]
    config: String,

    /// Overrides `data_dir` from the configuration file.
    #[arg(long)]
    data_dir: Option<String>,

    /// Overrides `rpc_port` from the configuration file.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The log level may come from the file, so load it before tracing is up
    // and report the outcome afterwards.
    let loaded = ServerConfig::load(&args.config);
    let mut server_config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => ServerConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&server_config.log_level)),
        )
        .init();

    match loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", args.config),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            args.config,
            e
        ),
    }

    if let Some(data_dir) = args.data_dir {
        server_config.data_dir = data_dir;
    }
    if let Some(port) = args.port {
        server_config.rpc_port = port;
    }

    tracing::info!("HCP server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Data directory: {}", server_config.data_dir);
    tracing::info!(
        "RPC endpoint: {}:{}",
        server_config.rpc_host,
        server_config.rpc_port
    );

    let db_path = server_config.db_path();
    std::fs::create_dir_all(&db_path)?;
    let store = RocksStore::open_with_span(
        &db_path,
        server_config.store_config(),
        tracing::info_span!("store", path = %db_path),
    )?;
    tracing::info!(
        partitions = store.partitions()?.len(),
        "Telemetry store opened at {}",
        db_path
    );
    let store: SharedStore = Arc::new(store);

    let server = HcpRpcServer::new(
        server_config.rpc_config(),
        store,
        tracing::info_span!("rpc"),
    );

    server
        .start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("HCP server exited cleanly");
    Ok(())
}
