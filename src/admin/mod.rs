//! Read-only admin API over the tracker.
//!
//! Served on its own listener. Nothing here mutates client records; the
//! tracker stays the only writer.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::gate::Gate;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub gate: Arc<Gate>,
    pub api_key: Arc<str>,
    pub started_at: Instant,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/stats", get(get_stats))
        .route("/admin/clients", get(list_clients))
        .route("/admin/clients/{identifier}", get(get_client))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
