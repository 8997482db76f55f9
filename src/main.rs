//! Request-admission gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │                  GATEKEEPER                  │
//!                       │                                              │
//!   Client Request      │  ┌──────────┐   ┌──────────┐   ┌──────────┐ │
//!   ────────────────────┼─▶│blacklist │──▶│   rate   │──▶│sanitizer │─┼──▶ handler
//!                       │  │  guard   │   │ limiter  │   │          │ │
//!                       │  └────┬─────┘   └────┬─────┘   └──────────┘ │
//!                       │       │ 403          │ 429                  │
//!                       │       ▼              ▼                      │
//!                       │    denied         denied                    │
//!                       │                                              │
//!                       │  ┌────────────────────────────────────────┐ │
//!                       │  │          Cross-Cutting Concerns        │ │
//!                       │  │  config │ admin API │ observability │  │ │
//!                       │  │         │           │ lifecycle     │  │ │
//!                       │  └────────────────────────────────────────┘ │
//!                       └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use gatekeeper::config::{load_config, GatekeeperConfig};
use gatekeeper::http::HttpServer;
use gatekeeper::lifecycle::Shutdown;
use gatekeeper::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(about = "Request-admission gateway: blacklist, rate limiting, sanitization")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gatekeeper starting");

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatekeeperConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        window_secs = config.rate_limit.window_secs,
        max_requests = config.rate_limit.max_requests,
        blacklist_seeds = config.access.blacklist.len(),
        whitelist_seeds = config.access.whitelist.len(),
        admin_enabled = config.admin.enabled,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
