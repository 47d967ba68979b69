//! Voucher relayer service.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌───────────────────────────────────────────────┐
//!                       │                VOUCHER RELAYER                 │
//!   POST /relay/mint    │  ┌────────┐    ┌────────────┐    ┌──────────┐  │
//!   ────────────────────┼─▶│  http  │───▶│   relay    │───▶│  store   │──┼──▶ Redis
//!                       │  │ server │    │ dispatcher │    │ reserve/ │  │
//!                       │  └────────┘    └─────┬──────┘    │ finalize │  │
//!                       │                      │           └──────────┘  │
//!                       │                      ▼                          │
//!                       │               ┌─────────────┐  ┌────────────┐  │
//!                       │               │ signer pool │─▶│ blockchain │──┼──▶ RPC
//!                       │               │ round robin │  │  gateway   │  │
//!                       │               └─────────────┘  └────────────┘  │
//!                       └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use voucher_relayer::config::{load_config, load_from_env};
use voucher_relayer::http::HttpServer;
use voucher_relayer::lifecycle::{bootstrap, shutdown_signal};
use voucher_relayer::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "voucher-relayer")]
#[command(about = "One-time voucher mint relayer", long_about = None)]
struct Args {
    /// TOML configuration file. Without it, defaults plus environment apply.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "voucher-relayer starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rpc_url = %config.chain.rpc_url,
        chain_id = config.chain.chain_id,
        relayers = config.relayer.count,
        store = ?config.store.backend,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let dispatcher = bootstrap(&config).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config.listener, dispatcher);
    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
