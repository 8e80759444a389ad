//! Stacks Guestbook service.
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!   Browser / CLI     │              stacks-guestbook                 │
//!   ──────────────────┼─▶ http (pages, /api) ──▶ store ──▶ stacks ────┼──▶ Stacks node API
//!                     │                           │          │        │
//!                     │           refresh monitor ┘          └────────┼──▶ Wallet (signer)
//!                     └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use stacks_guestbook::config::load_effective_config;
use stacks_guestbook::http::{build_store, HttpServer};
use stacks_guestbook::lifecycle::{wait_for_signal, Shutdown};
use stacks_guestbook::observability::{logging, metrics};
use stacks_guestbook::store::RefreshMonitor;

#[derive(Parser)]
#[command(name = "stacks-guestbook")]
#[command(about = "Decentralized guestbook on the Stacks blockchain", long_about = None)]
struct Args {
    /// Path to the TOML config file (falls back to GUESTBOOK_CONFIG).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_effective_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_filter);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "stacks-guestbook starting");

    let network = config.current_network();
    tracing::info!(
        network = %config.app.network,
        contract = %format!("{}.{}", network.contract_address, network.contract_name),
        api_url = %network.api_url,
        bind_address = %config.listener.bind_address,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = build_store(&config)?;
    store.auth().check_auth().await;

    let shutdown = Shutdown::new();

    let monitor = RefreshMonitor::new(
        store.clone(),
        Duration::from_millis(config.app.refresh_interval_ms),
    );
    let monitor_handle = tokio::spawn(monitor.run(shutdown.subscribe()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(Arc::new(config), store);
    server.run(listener, server_shutdown).await?;

    if let Err(e) = monitor_handle.await {
        tracing::warn!(error = %e, "Refresh monitor task failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
