//! JSON-RPC forwarding gateway binary.
//!
//! Thin process wrapper around the library: parse CLI arguments, load and
//! validate configuration, initialize logging/metrics, and run the HTTP
//! shell until a shutdown signal arrives.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rpc_gateway::config::loader::load_config;
use rpc_gateway::config::GatewayConfig;
use rpc_gateway::http::HttpServer;
use rpc_gateway::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "rpc-gateway", about = "JSON-RPC request-forwarding gateway")]
struct Args {
    /// Path to the TOML configuration file (defaults apply when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("rpc-gateway v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        max_concurrent = config.scheduler.max_concurrent,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
