//! Axum middleware running the gate ahead of route handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::gate::{Gate, GateOutcome};

/// JSON body of a denial.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DenialBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Turn a gate outcome into a response, forwarding to `next` when allowed.
pub async fn gate_middleware(
    State(gate): State<Arc<Gate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // ConnectInfo is absent when the router is driven without a socket
    // (e.g. `oneshot` in tests); the identity code handles `None`.
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let identifier = gate.identify(request.headers(), peer);
    let outcome = gate.check(&identifier, request.headers(), request.uri().path());

    match outcome {
        GateOutcome::PassThrough => next.run(request).await,
        GateOutcome::Allow(quota) => {
            let mut response = next.run(request).await;
            quota.apply(response.headers_mut());
            response
        }
        GateOutcome::Forbidden(_) => (
            StatusCode::FORBIDDEN,
            Json(DenialBody {
                error: "Not allowed",
                retry_after: None,
            }),
        )
            .into_response(),
        GateOutcome::TooManyRequests {
            retry_after_secs, ..
        } => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, HeaderValue::from(retry_after_secs))],
            Json(DenialBody {
                error: "Too many requests",
                retry_after: Some(retry_after_secs),
            }),
        )
            .into_response(),
    }
}
