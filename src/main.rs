//! rate-gate
//!
//! Rate limiting and bot filtering gateway in front of a web application.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌────────────────────────────────────────────────┐
//!                        │                   RATE GATE                    │
//!     Client Request     │  ┌─────────┐   ┌──────────┐   ┌────────────┐   │
//!     ───────────────────┼─▶│ request │──▶│  routes  │──▶│    bot     │   │
//!                        │  │   id    │   │ protected│   │  detector  │   │
//!                        │  └─────────┘   └────┬─────┘   └─────┬──────┘   │
//!                        │        not protected│         human │          │
//!                        │                     │               ▼          │
//!                        │                     │        ┌────────────┐    │
//!                        │                     │        │  request   │◀─┐ │
//!                        │                     │        │  tracker   │  │ │
//!                        │                     │        └─────┬──────┘  │ │
//!                        │                     ▼              ▼         │ │
//!     Client Response    │               ┌─────────────────────────┐    │ │     Upstream
//!     ◀──────────────────┼───────────────│     proxy handler       │◀───┼─┼──── App
//!                        │               └─────────────────────────┘    │ │
//!                        │                                  collector ──┘ │
//!                        └────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use rate_gate::config::{load_config, AppConfig, ConfigWatcher};
use rate_gate::http::HttpServer;
use rate_gate::lifecycle::{shutdown_on_signal, Shutdown};
use rate_gate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "rate-gate")]
#[command(about = "Rate limiting and bot filtering gateway", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not reload the config file when it changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!("rate-gate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        block_secs = config.rate_limit.block_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the whole run; dropping it stops watching.
    let (_watcher, config_updates) = match &args.config {
        Some(path) if !args.no_watch => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config.clone());

    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
        let admin_app = server.admin_router();
        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let served = axum::serve(admin_listener, admin_app)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin server failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server_shutdown = shutdown.subscribe();
    let mut server_task =
        tokio::spawn(async move { server.run(listener, config_updates, server_shutdown).await });

    tokio::select! {
        _ = shutdown_on_signal(&shutdown) => {
            server_task.await??;
        }
        finished = &mut server_task => {
            // Server exited on its own; stop the admin listener too.
            shutdown.trigger();
            finished??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
