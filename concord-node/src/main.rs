use std::sync::Arc;

use clap::Parser;
use concord_node::cli::Args;
use concord_node::setup::{audit_log_name, ensure_config};
use concord_node::{Config, Node, NodeIdentity};
use concord_p2p::{TcpListenerHandle, TcpTransport};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Parse arguments
    let args = Args::parse();

    // 2. Logging: protocol events to the audit file, everything else to stdout
    std::fs::create_dir_all("logs")?;
    let log_filename = audit_log_name(&args.config, args.index);
    let file_appender = tracing_appender::rolling::never(".", log_filename);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let consensus_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() == "consensus"
        }));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,concord_node=debug".into()),
        )
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() != "consensus"
        }));

    tracing_subscriber::registry()
        .with(consensus_layer)
        .with(stdout_layer)
        .init();

    info!("--- STARTING CONCORD NODE ---");
    info!("Config: {}", args.config);

    // 2b. Resolve config
    ensure_config(&args.config)?;
    let config = Config::load_from_file(&args.config)?.with_overrides(&args);
    info!("Running as {}-{} on {}", config.owner, config.index, config.listen_address());

    // 3. Listener
    let (inbound_tx, inbound_rx) = mpsc::channel(1024);
    let listener = match TcpListenerHandle::bind(&config.listen_address(), inbound_tx).await {
        Ok(l) => l,
        Err(e) => {
            error!("Cannot listen on {}: {}", config.listen_address(), e);
            return Err(e.into());
        }
    };
    info!("👂 Listening on {}", listener.local_addr());

    // 4. Register with the hub and serve
    let identity = NodeIdentity {
        owner: config.owner.clone(),
        index: config.index,
        host: config.host.clone(),
        port: config.port,
    };
    let node = Node::new(identity, config.hub_endpoint()?, Arc::new(TcpTransport::new()), config.consensus()?);
    node.register().await?;

    node.run(inbound_rx, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down");
    })
    .await;

    listener.shutdown();
    Ok(())
}
