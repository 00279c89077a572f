//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, Router};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use rate_gate::config::AppConfig;
use rate_gate::http::{HttpServer, ServerError};
use rate_gate::lifecycle::Shutdown;
use rate_gate::limiter::Clock;

pub const BROWSER_UA: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15";

/// Start a mock upstream that answers every request with
/// `"<method> <path> xff=<x-forwarded-for>"`.
#[allow(dead_code)]
pub async fn start_mock_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(|request: Request<Body>| async move {
        let xff = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        format!("{} {} xff={}", request.method(), request.uri().path(), xff)
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A running gate server.
#[allow(dead_code)]
pub struct RunningGate {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_tx: mpsc::UnboundedSender<AppConfig>,
    pub task: JoinHandle<Result<(), ServerError>>,
    pub admin: Router,
}

/// Start the gate on an ephemeral port in front of `config.upstream`.
#[allow(dead_code)]
pub async fn start_gate(config: AppConfig, clock: Arc<dyn Clock>) -> RunningGate {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::with_clock(config, clock);
    let admin = server.admin_router();
    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    let task = tokio::spawn(async move { server.run(listener, config_updates, server_shutdown).await });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    RunningGate {
        addr,
        shutdown,
        config_tx,
        task,
        admin,
    }
}
