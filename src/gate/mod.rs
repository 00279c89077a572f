//! Rate limit gate.
//!
//! # Data Flow
//! ```text
//! (client id, headers, path)
//!     → ProtectedRoutes   not protected → PassThrough
//!     → BotDetector       bot           → Forbidden (tracker untouched)
//!     → RequestTracker    Allowed       → Allow(quota headers)
//!                         RateLimited   → TooManyRequests (fixed hint)
//!                         Blocked       → TooManyRequests (time left)
//! ```
//!
//! # Design Decisions
//! - Bot traffic never reaches the tracker, so it cannot exhaust a shared
//!   client budget
//! - Rules live behind an `ArcSwap` and reload without touching tracker
//!   state
//! - `check` is synchronous and infallible

pub mod middleware;

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::AppConfig;
use crate::limiter::{Clock, Decision, LimitPolicy, Millis, RequestTracker};
use crate::observability::metrics;
use crate::routing::ProtectedRoutes;
use crate::security::{client_identifier, BotDetector, BotReason, BotVerdict};

pub use middleware::gate_middleware;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Quota information attached to allowed responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    /// End of the current window (epoch ms).
    pub reset_at: Millis,
}

impl Quota {
    /// Write the `X-RateLimit-*` headers.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset_at));
    }
}

/// What to do with one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Not subject to the gate (unprotected route, or rate limiting off).
    PassThrough,
    /// Within quota; forward and attach the quota headers.
    Allow(Quota),
    /// Classified as a bot. Not retryable.
    Forbidden(BotReason),
    /// Over quota or blocked.
    TooManyRequests { retry_after_secs: u64, blocked: bool },
}

impl GateOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            GateOutcome::PassThrough => "pass_through",
            GateOutcome::Allow(_) => "allowed",
            GateOutcome::Forbidden(_) => "bot",
            GateOutcome::TooManyRequests { blocked: false, .. } => "rate_limited",
            GateOutcome::TooManyRequests { blocked: true, .. } => "blocked",
        }
    }
}

/// Reloadable part of the gate.
#[derive(Debug)]
struct GateRules {
    routes: ProtectedRoutes,
    bots: BotDetector,
    rate_limit_enabled: bool,
    trust_forwarded_for: bool,
}

impl GateRules {
    fn from_config(config: &AppConfig) -> Self {
        Self {
            routes: ProtectedRoutes::from_config(&config.protected_routes.patterns),
            bots: BotDetector::from_config(&config.bot_detection),
            rate_limit_enabled: config.rate_limit.enabled,
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
        }
    }
}

/// Request gate in front of the upstream.
pub struct Gate {
    tracker: Arc<RequestTracker>,
    clock: Arc<dyn Clock>,
    rules: ArcSwap<GateRules>,
}

impl Gate {
    pub fn new(config: &AppConfig, tracker: Arc<RequestTracker>, clock: Arc<dyn Clock>) -> Self {
        tracker.set_policy(LimitPolicy::from(&config.rate_limit));
        Self {
            tracker,
            clock,
            rules: ArcSwap::from_pointee(GateRules::from_config(config)),
        }
    }

    /// Gate over a fresh in-memory tracker.
    pub fn in_memory(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let tracker = Arc::new(RequestTracker::in_memory(LimitPolicy::from(&config.rate_limit)));
        Self::new(config, tracker, clock)
    }

    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Rate-limit key for a request.
    pub fn identify(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        client_identifier(headers, peer, self.rules.load().trust_forwarded_for)
    }

    /// Decide on one request.
    pub fn check(&self, identifier: &str, headers: &HeaderMap, path: &str) -> GateOutcome {
        let outcome = self.evaluate(identifier, headers, path);
        metrics::record_decision(outcome.label());
        outcome
    }

    fn evaluate(&self, identifier: &str, headers: &HeaderMap, path: &str) -> GateOutcome {
        let rules = self.rules.load();

        if !rules.routes.is_protected(path) {
            return GateOutcome::PassThrough;
        }

        match rules.bots.classify(headers, path) {
            BotVerdict::Bot(reason) => {
                tracing::warn!(client = %identifier, path = %path, reason = %reason, "Bot detected and blocked");
                return GateOutcome::Forbidden(reason);
            }
            BotVerdict::AllowedCrawler => {
                tracing::debug!(client = %identifier, "Allowed crawler");
            }
            BotVerdict::Human => {}
        }

        if !rules.rate_limit_enabled {
            return GateOutcome::PassThrough;
        }

        match self
            .tracker
            .upsert_on_request(identifier, self.clock.now_millis())
        {
            Decision::Allowed {
                limit,
                remaining,
                reset_at,
            } => GateOutcome::Allow(Quota {
                limit,
                remaining,
                reset_at,
            }),
            Decision::RateLimited { retry_after_secs } => {
                tracing::info!(client = %identifier, path = %path, "Rate limit exceeded");
                GateOutcome::TooManyRequests {
                    retry_after_secs,
                    blocked: false,
                }
            }
            Decision::Blocked { retry_after_secs } => {
                tracing::info!(client = %identifier, retry_after_secs, "Blocked request");
                GateOutcome::TooManyRequests {
                    retry_after_secs,
                    blocked: true,
                }
            }
        }
    }

    /// Apply new routes, bot rules and limits. Tracker records survive.
    pub fn reload(&self, config: &AppConfig) {
        let rules = GateRules::from_config(config);
        let routes = rules.routes.len();
        self.rules.store(Arc::new(rules));
        self.tracker.set_policy(LimitPolicy::from(&config.rate_limit));
        tracing::info!(
            max_requests = config.rate_limit.max_requests,
            window_secs = config.rate_limit.window_secs,
            routes,
            "Gate rules reloaded"
        );
    }
}
