//! Per-client window record and its state transition.
//!
//! # State Transitions
//! ```text
//! (none) ──first request──▶ Counting
//! Counting ──over cap──▶ WarnedOnce ──over cap──▶ WarnedTwice ──over cap──▶ Blocked
//! Blocked ──blocked_until lapses, next request──▶ Counting (strikes kept)
//! ```
//!
//! Strikes never decay. A client that has been blocked once is blocked again
//! on its next over-cap request.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RateLimitConfig;
use crate::limiter::clock::Millis;

/// Limits applied by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitPolicy {
    /// Length of a counting window.
    pub window: Duration,
    /// Requests allowed per window.
    pub max_requests: u32,
    /// How long a client stays blocked once the strike threshold is hit.
    pub block_duration: Duration,
    /// Strikes needed before a block.
    pub strike_threshold: u32,
    /// Retry hint returned with a plain rate-limit denial. Fixed, not derived
    /// from the time left in the window.
    pub rate_limited_retry_after: Duration,
}

impl LimitPolicy {
    fn window_millis(&self) -> Millis {
        self.window.as_millis() as Millis
    }

    fn block_millis(&self) -> Millis {
        self.block_duration.as_millis() as Millis
    }
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl From<&RateLimitConfig> for LimitPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
            block_duration: Duration::from_secs(config.block_secs),
            strike_threshold: config.strike_threshold,
            rate_limited_retry_after: Duration::from_secs(config.retry_after_secs),
        }
    }
}

/// Result of recording one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request is within quota.
    Allowed {
        /// Cap of the policy this decision was made under.
        limit: u32,
        /// Requests left in the current window.
        remaining: u32,
        /// End of the current window (epoch ms).
        reset_at: Millis,
    },
    /// Over the per-window cap.
    RateLimited { retry_after_secs: u64 },
    /// Client is inside a block period.
    Blocked { retry_after_secs: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    /// Label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allowed { .. } => "allowed",
            Decision::RateLimited { .. } => "rate_limited",
            Decision::Blocked { .. } => "blocked",
        }
    }
}

/// Coarse state of a client, derived from its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientState {
    Counting,
    WarnedOnce,
    WarnedTwice,
    Blocked,
}

/// Tracking record for one client identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientWindow {
    pub identifier: String,
    pub request_count: u32,
    pub window_start: Millis,
    pub suspicious_strikes: u32,
    pub blocked_until: Option<Millis>,
}

impl ClientWindow {
    /// Record for a client seen for the first time.
    pub fn first_seen(identifier: impl Into<String>, now: Millis) -> Self {
        Self {
            identifier: identifier.into(),
            request_count: 1,
            window_start: now,
            suspicious_strikes: 0,
            blocked_until: None,
        }
    }

    /// True while `blocked_until` lies in the future.
    pub fn is_blocked_at(&self, now: Millis) -> bool {
        matches!(self.blocked_until, Some(until) if until > now)
    }

    /// End of the current counting window.
    pub fn window_end(&self, policy: &LimitPolicy) -> Millis {
        self.window_start.saturating_add(policy.window_millis())
    }

    /// Whether the collector may drop this record: any block has lapsed and
    /// the client has been idle for two full windows.
    pub fn is_evictable(&self, policy: &LimitPolicy, now: Millis) -> bool {
        let block_lapsed = self.blocked_until.map_or(true, |until| until < now);
        let idle_until = self
            .window_start
            .saturating_add(policy.window_millis().saturating_mul(2));
        block_lapsed && idle_until < now
    }

    pub fn state_at(&self, now: Millis) -> ClientState {
        if self.is_blocked_at(now) {
            return ClientState::Blocked;
        }
        match self.suspicious_strikes {
            1 => ClientState::WarnedOnce,
            2 => ClientState::WarnedTwice,
            _ => ClientState::Counting,
        }
    }

    fn allowed(&self, policy: &LimitPolicy) -> Decision {
        Decision::Allowed {
            limit: policy.max_requests,
            remaining: policy.max_requests.saturating_sub(self.request_count),
            reset_at: self.window_end(policy),
        }
    }

    /// Apply one request to an existing record.
    fn record_request(&mut self, policy: &LimitPolicy, now: Millis) -> Decision {
        if let Some(until) = self.blocked_until.filter(|until| *until > now) {
            return Decision::Blocked {
                retry_after_secs: (until - now).div_ceil(1000),
            };
        }

        if self.window_end(policy) < now {
            self.request_count = 1;
            self.window_start = now;
            return self.allowed(policy);
        }

        self.request_count = self.request_count.saturating_add(1);
        if self.request_count <= policy.max_requests {
            return self.allowed(policy);
        }

        self.suspicious_strikes = self.suspicious_strikes.saturating_add(1);
        if self.suspicious_strikes >= policy.strike_threshold {
            self.blocked_until = Some(now.saturating_add(policy.block_millis()));
            return Decision::Blocked {
                retry_after_secs: policy.block_millis().div_ceil(1000),
            };
        }

        Decision::RateLimited {
            retry_after_secs: policy.rate_limited_retry_after.as_secs(),
        }
    }
}

/// Compute the record that should replace `current` after one request, and
/// the decision for that request. Pure: commits nothing.
pub fn transition(
    current: Option<&ClientWindow>,
    identifier: &str,
    policy: &LimitPolicy,
    now: Millis,
) -> (ClientWindow, Decision) {
    match current {
        None => {
            let record = ClientWindow::first_seen(identifier, now);
            let decision = record.allowed(policy);
            (record, decision)
        }
        Some(existing) => {
            let mut next = existing.clone();
            let decision = next.record_request(policy, now);
            (next, decision)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(cap: u32) -> LimitPolicy {
        LimitPolicy {
            window: Duration::from_secs(60),
            max_requests: cap,
            block_duration: Duration::from_secs(300),
            strike_threshold: 3,
            rate_limited_retry_after: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_first_request_creates_record() {
        let (record, decision) = transition(None, "1.2.3.4", &policy(3), 10_000);
        assert_eq!(record, ClientWindow::first_seen("1.2.3.4", 10_000));
        assert_eq!(
            decision,
            Decision::Allowed {
                limit: 3,
                remaining: 2,
                reset_at: 70_000
            }
        );
    }

    #[test]
    fn test_active_block_short_circuits() {
        let mut record = ClientWindow::first_seen("a", 0);
        record.blocked_until = Some(10_500);

        let (next, decision) = transition(Some(&record), "a", &policy(3), 9_000);
        // 1.5s left rounds up.
        assert_eq!(decision, Decision::Blocked { retry_after_secs: 2 });
        assert_eq!(next, record);
    }

    #[test]
    fn test_window_reset_requires_strictly_elapsed_window() {
        let mut record = ClientWindow::first_seen("a", 0);
        record.request_count = 3;

        // Exactly at the window end the old window still counts.
        let (_, at_edge) = transition(Some(&record), "a", &policy(3), 60_000);
        assert!(matches!(at_edge, Decision::RateLimited { .. }));

        let (next, after) = transition(Some(&record), "a", &policy(3), 60_001);
        assert!(after.is_allowed());
        assert_eq!(next.request_count, 1);
        assert_eq!(next.window_start, 60_001);
    }

    #[test]
    fn test_strike_threshold_blocks() {
        let mut record = ClientWindow::first_seen("a", 0);
        record.request_count = 3;
        record.suspicious_strikes = 2;

        let (next, decision) = transition(Some(&record), "a", &policy(3), 1_000);
        assert_eq!(decision, Decision::Blocked { retry_after_secs: 300 });
        assert_eq!(next.suspicious_strikes, 3);
        assert_eq!(next.blocked_until, Some(301_000));
    }

    #[test]
    fn test_eviction_needs_both_conditions() {
        let p = policy(3);
        let mut record = ClientWindow::first_seen("a", 0);
        record.blocked_until = Some(300_000);

        // Idle long enough but still blocked.
        assert!(!record.is_evictable(&p, 200_000));
        // Block lapsed but window_start + 2W not yet passed.
        record.window_start = 250_000;
        assert!(!record.is_evictable(&p, 300_001));
        // Both passed.
        assert!(record.is_evictable(&p, 370_001));

        let never_blocked = ClientWindow::first_seen("b", 0);
        assert!(!never_blocked.is_evictable(&p, 120_000));
        assert!(never_blocked.is_evictable(&p, 120_001));
    }

    #[test]
    fn test_derived_state() {
        let mut record = ClientWindow::first_seen("a", 0);
        assert_eq!(record.state_at(0), ClientState::Counting);
        record.suspicious_strikes = 1;
        assert_eq!(record.state_at(0), ClientState::WarnedOnce);
        record.suspicious_strikes = 2;
        assert_eq!(record.state_at(0), ClientState::WarnedTwice);
        record.suspicious_strikes = 3;
        record.blocked_until = Some(100);
        assert_eq!(record.state_at(50), ClientState::Blocked);
        assert_eq!(record.state_at(100), ClientState::Counting);
    }
}
