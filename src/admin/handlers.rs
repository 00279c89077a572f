use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::limiter::{ClientState, ClientWindow, LimitPolicy};

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PolicySummary {
    pub window_secs: u64,
    pub max_requests: u32,
    pub block_secs: u64,
    pub strike_threshold: u32,
}

impl From<&LimitPolicy> for PolicySummary {
    fn from(policy: &LimitPolicy) -> Self {
        Self {
            window_secs: policy.window.as_secs(),
            max_requests: policy.max_requests,
            block_secs: policy.block_duration.as_secs(),
            strike_threshold: policy.strike_threshold,
        }
    }
}

/// Tracked clients by derived state.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GateStats {
    pub tracked_clients: usize,
    pub counting: usize,
    pub warned_once: usize,
    pub warned_twice: usize,
    pub blocked: usize,
    pub policy: Option<PolicySummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientStatus {
    #[serde(flatten)]
    pub window: ClientWindow,
    pub state: ClientState,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn get_stats(State(state): State<AdminState>) -> Json<GateStats> {
    let now = state.gate.clock().now_millis();
    let tracker = state.gate.tracker();

    let mut stats = GateStats {
        policy: Some(PolicySummary::from(&*tracker.policy())),
        ..Default::default()
    };
    for record in tracker.snapshot() {
        stats.tracked_clients += 1;
        match record.state_at(now) {
            ClientState::Counting => stats.counting += 1,
            ClientState::WarnedOnce => stats.warned_once += 1,
            ClientState::WarnedTwice => stats.warned_twice += 1,
            ClientState::Blocked => stats.blocked += 1,
        }
    }
    Json(stats)
}

pub async fn list_clients(State(state): State<AdminState>) -> Json<Vec<ClientStatus>> {
    let now = state.gate.clock().now_millis();
    let mut clients: Vec<ClientStatus> = state
        .gate
        .tracker()
        .snapshot()
        .into_iter()
        .map(|window| ClientStatus {
            state: window.state_at(now),
            window,
        })
        .collect();
    clients.sort_by(|a, b| a.window.identifier.cmp(&b.window.identifier));
    Json(clients)
}

pub async fn get_client(
    State(state): State<AdminState>,
    Path(identifier): Path<String>,
) -> Result<Json<ClientStatus>, StatusCode> {
    let now = state.gate.clock().now_millis();
    state
        .gate
        .tracker()
        .get(&identifier)
        .map(|window| {
            Json(ClientStatus {
                state: window.state_at(now),
                window,
            })
        })
        .ok_or(StatusCode::NOT_FOUND)
}
