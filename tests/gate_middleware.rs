//! Gate middleware driven through an in-process router.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use rate_gate::config::AppConfig;
use rate_gate::gate::{gate_middleware, Gate};
use rate_gate::limiter::ManualClock;

mod common;
use common::BROWSER_UA;

fn app(gate: Arc<Gate>) -> Router {
    Router::new()
        .route("/api/generate", post(|| async { "generated" }))
        .route("/download", get(|| async { "file" }))
        .route("/cv", get(|| async { "form" }))
        .layer(middleware::from_fn_with_state(gate, gate_middleware))
}

fn setup(cap: u32) -> (Router, Arc<Gate>, Arc<ManualClock>) {
    let mut config = AppConfig::default();
    config.rate_limit.max_requests = cap;
    config.rate_limit.trust_forwarded_for = true;
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let gate = Arc::new(Gate::in_memory(&config, clock.clone()));
    (app(gate.clone()), gate, clock)
}

fn request(method: &str, path: &str, client: &str, user_agent: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::USER_AGENT, user_agent)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

async fn json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_allowed_response_carries_quota_headers() {
    let (app, _, _) = setup(30);

    let res = send(&app, request("POST", "/api/generate", "1.2.3.4", BROWSER_UA)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-ratelimit-limit"], "30");
    assert_eq!(res.headers()["x-ratelimit-remaining"], "29");
    assert_eq!(res.headers()["x-ratelimit-reset"], "1700000060000");

    let body = to_bytes(res.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"generated");
}

#[tokio::test]
async fn test_unprotected_route_is_untouched() {
    let (app, gate, _) = setup(1);

    for _ in 0..5 {
        let res = send(&app, request("GET", "/cv", "1.2.3.4", "curl/8.4.0")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get("x-ratelimit-limit").is_none());
    }
    assert!(gate.tracker().is_empty());
}

#[tokio::test]
async fn test_bot_gets_403() {
    let (app, gate, _) = setup(30);

    let res = send(&app, request("POST", "/api/generate", "5.6.7.8", "python-requests scraper")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(json(res).await, serde_json::json!({ "error": "Not allowed" }));
    assert!(gate.tracker().get("5.6.7.8").is_none());
}

#[tokio::test]
async fn test_over_cap_gets_429_with_retry_after() {
    let (app, _, _) = setup(2);

    for _ in 0..2 {
        let res = send(&app, request("GET", "/download", "9.9.9.9", BROWSER_UA)).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = send(&app, request("GET", "/download", "9.9.9.9", BROWSER_UA)).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers()[header::RETRY_AFTER], "60");
    assert_eq!(
        json(res).await,
        serde_json::json!({ "error": "Too many requests", "retryAfter": 60 })
    );

    // A different forwarded client has its own budget.
    let res = send(&app, request("GET", "/download", "9.9.9.10", BROWSER_UA)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_burst_pattern_escalates_to_block() {
    let (app, gate, clock) = setup(3);
    let mut statuses = Vec::new();

    for burst in 0..3 {
        for _ in 0..4 {
            let res = send(&app, request("POST", "/api/generate", "1.2.3.4", BROWSER_UA)).await;
            statuses.push(res.status().as_u16());
            if burst == 2 && statuses.len() == 12 {
                assert_eq!(json(res).await["retryAfter"], 300);
            }
        }
        clock.advance(Duration::from_secs(61));
    }

    assert_eq!(
        statuses,
        vec![200, 200, 200, 429, 200, 200, 200, 429, 200, 200, 200, 429]
    );
    assert_eq!(gate.tracker().get("1.2.3.4").unwrap().suspicious_strikes, 3);

    // Still blocked 61s into the block: the countdown header reflects it.
    let res = send(&app, request("POST", "/api/generate", "1.2.3.4", BROWSER_UA)).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers()[header::RETRY_AFTER], "239");
}
