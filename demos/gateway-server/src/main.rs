//! Agent gateway server.
//!
//! Run with: cargo run -p agent-gateway-server -- --echo
//!
//! Then POST to http://localhost:8000/chat or connect to ws://localhost:8000/ws.

mod echo;

use std::{path::PathBuf, sync::Arc};

use agent_gateway_transport::{Gateway, GatewayConfig};
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::echo::EchoAgent;

/// REST and WebSocket gateway in front of a conversational agent.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Override the listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind the built-in echo agent.
    #[arg(long)]
    echo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = GatewayConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    let addr = config.socket_addr()?;

    let gateway = Gateway::new(config);
    if args.echo {
        gateway.bind_agent(Arc::new(EchoAgent::new()));
    } else {
        tracing::warn!("no agent bound; /chat will answer 503 until one is");
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    gateway.serve(listener, shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
