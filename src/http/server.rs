//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gate in front of the proxy handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Forward requests to the upstream application
//! - Run the collector for the lifetime of the server
//! - Apply config reloads to the gate while serving

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{uri::Scheme, HeaderValue, Request, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::AppConfig;
use crate::gate::{gate_middleware, Gate};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::limiter::{Clock, Collector, SystemClock};
use crate::observability::metrics;
use crate::security::identity::X_FORWARDED_FOR;

/// Error type for server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<Gate>,
    pub client: Client<HttpConnector, Body>,
    /// Upstream authority, e.g. "127.0.0.1:3000".
    pub upstream: Arc<str>,
    pub started_at: Instant,
}

/// HTTP server for the gate.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a server whose limiter reads time from `clock`.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let gate = Arc::new(Gate::in_memory(&config, clock));

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            gate,
            client,
            upstream: Arc::from(config.upstream.address.as_str()),
            started_at: Instant::now(),
        };

        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let gate = state.gate.clone();
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(gate, gate_middleware))
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id(request),
                    )
                }),
            )
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// Router serving gated proxy traffic.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Router for the admin API, built over the same gate.
    pub fn admin_router(&self) -> Router {
        setup_admin_router(AdminState {
            gate: self.state.gate.clone(),
            api_key: Arc::from(self.config.admin.api_key.as_str()),
            started_at: self.state.started_at,
        })
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// The collector runs alongside the server and is stopped after the
    /// last connection drains. Configs arriving on `config_updates` are
    /// applied to the gate.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.state.upstream,
            "HTTP server starting"
        );

        let gate = self.state.gate.clone();
        let collector = Collector::new(
            gate.tracker().clone(),
            gate.clock().clone(),
            Duration::from_secs(self.config.collector.sweep_interval_secs),
        )
        .start();

        let reloader = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                gate.reload(&new_config);
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await;

        reloader.abort();
        collector.stop().await;
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward a request that passed the gate to the upstream.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request).to_string();
    let (mut parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let uri = match Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(&*state.upstream)
        .path_and_query(path_and_query)
        .build()
    {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, upstream = %state.upstream, error = %e, "Invalid upstream URI");
            return (StatusCode::BAD_GATEWAY, "Invalid upstream address").into_response();
        }
    };
    parts.uri = uri;

    if let Some(ConnectInfo(peer)) = parts.extensions.get::<ConnectInfo<SocketAddr>>().copied() {
        let forwarded = match parts
            .headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
        {
            Some(existing) => format!("{}, {}", existing, peer.ip()),
            None => peer.ip().to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded) {
            parts.headers.insert(X_FORWARDED_FOR, value);
        }
    }

    tracing::debug!(request_id = %request_id, uri = %parts.uri, "Forwarding request");

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_upstream(response.status().as_u16(), start_time);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16(), start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
