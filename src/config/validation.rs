//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window, cap, block > 0; block >= window)
//! - Validate addresses and route patterns
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{AppConfig, RoutePattern, PLACEHOLDER_ADMIN_KEY};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("rate_limit.block_secs ({block_secs}) must be at least rate_limit.window_secs ({window_secs})")]
    BlockShorterThanWindow { block_secs: u64, window_secs: u64 },

    #[error("upstream.address must not be empty")]
    EmptyUpstream,

    #[error("route pattern {0:?} must be a non-empty path starting with '/'")]
    InvalidRoute(RoutePattern),

    #[error("bot_detection patterns must not be empty strings")]
    EmptyBotPattern,

    #[error("admin.api_key must be changed from the placeholder when admin is enabled")]
    PlaceholderAdminKey,
}

/// Check `config` and return every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let rl = &config.rate_limit;
    for (field, value) in [
        ("rate_limit.window_secs", rl.window_secs),
        ("rate_limit.max_requests", u64::from(rl.max_requests)),
        ("rate_limit.block_secs", rl.block_secs),
        ("rate_limit.strike_threshold", u64::from(rl.strike_threshold)),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("collector.sweep_interval_secs", config.collector.sweep_interval_secs),
        ("limits.max_body_size", config.limits.max_body_size as u64),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    // A block that lapses inside the window it was earned in would leave the
    // over-cap count in place and re-block on the next request.
    if rl.block_secs > 0 && rl.block_secs < rl.window_secs {
        errors.push(ValidationError::BlockShorterThanWindow {
            block_secs: rl.block_secs,
            window_secs: rl.window_secs,
        });
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_ADMIN_KEY {
            errors.push(ValidationError::PlaceholderAdminKey);
        }
    }

    if config.upstream.address.trim().is_empty() {
        errors.push(ValidationError::EmptyUpstream);
    }

    for pattern in config
        .protected_routes
        .patterns
        .iter()
        .chain(&config.bot_detection.header_signal_routes)
    {
        let valid = match pattern {
            RoutePattern::Prefix(p) | RoutePattern::Exact(p) => p.starts_with('/'),
            RoutePattern::Contains(p) => !p.is_empty(),
        };
        if !valid {
            errors.push(ValidationError::InvalidRoute(pattern.clone()));
        }
    }

    let bots = &config.bot_detection;
    if bots
        .deny_patterns
        .iter()
        .chain(&bots.allow_patterns)
        .any(|p| p.trim().is_empty())
    {
        errors.push(ValidationError::EmptyBotPattern);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
