//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The application requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// User-agent and header based bot detection.
    pub bot_detection: BotDetectionConfig,

    /// Paths subject to the gate.
    pub protected_routes: ProtectedRoutesConfig,

    /// Background eviction of stale clients.
    pub collector: CollectorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream authority (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting. Bot detection still runs when disabled.
    pub enabled: bool,

    /// Counting window length in seconds.
    pub window_secs: u64,

    /// Maximum requests per window per client.
    pub max_requests: u32,

    /// Block length in seconds once the strike threshold is reached.
    /// Must be at least `window_secs`.
    pub block_secs: u64,

    /// Number of over-cap denials before a client is blocked.
    pub strike_threshold: u32,

    /// Retry hint sent with a plain rate-limit denial, in seconds.
    pub retry_after_secs: u64,

    /// Use the first `X-Forwarded-For` entry as the client identifier.
    /// Only enable behind a proxy that sets the header itself.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 60,
            max_requests: 30,
            block_secs: 300,
            strike_threshold: 3,
            retry_after_secs: 60,
            trust_forwarded_for: false,
        }
    }
}

/// Bot detection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BotDetectionConfig {
    /// Enable bot detection.
    pub enabled: bool,

    /// Case-insensitive user-agent substrings that mark a bot.
    pub deny_patterns: Vec<String>,

    /// Case-insensitive user-agent substrings of crawlers that are let
    /// through. Checked before everything else.
    pub allow_patterns: Vec<String>,

    /// Also treat missing browser headers (user-agent, accept-language,
    /// referer alongside origin) as bot signals.
    pub header_signals: bool,

    /// Paths the header signals apply to. Other protected paths are judged
    /// on the user agent alone. Empty means every protected path.
    pub header_signal_routes: Vec<RoutePattern>,
}

impl Default for BotDetectionConfig {
    fn default() -> Self {
        let deny = [
            "bot",
            "crawl",
            "spider",
            "scrape",
            "headless",
            "selenium",
            "puppeteer",
            "chrome-lighthouse",
            "slurp",
            "dataminer",
            "wget",
            "curl",
        ];
        let allow = ["googlebot", "bingbot", "yandexbot", "duckduckbot"];
        Self {
            enabled: true,
            deny_patterns: deny.iter().map(|p| p.to_string()).collect(),
            allow_patterns: allow.iter().map(|p| p.to_string()).collect(),
            header_signals: false,
            header_signal_routes: vec![RoutePattern::Prefix("/api/".to_string())],
        }
    }
}

/// One protected path pattern.
///
/// In TOML: `{ prefix = "/api/generate" }`, `{ exact = "/download" }` or
/// `{ contains = "/auth/" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePattern {
    Prefix(String),
    Exact(String),
    Contains(String),
}

/// Protected route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtectedRoutesConfig {
    /// A request is gated when any pattern matches its path.
    pub patterns: Vec<RoutePattern>,
}

impl Default for ProtectedRoutesConfig {
    fn default() -> Self {
        Self {
            patterns: vec![
                RoutePattern::Prefix("/api/generate".to_string()),
                RoutePattern::Prefix("/api/download".to_string()),
                RoutePattern::Exact("/generate".to_string()),
                RoutePattern::Exact("/download".to_string()),
                RoutePattern::Contains("/auth/".to_string()),
            ],
        }
    }
}

/// Collector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Sweep interval in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Placeholder admin key; rejected by validation when the admin API is on.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
