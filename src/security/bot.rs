//! Bot detection from request headers.
//!
//! # Responsibilities
//! - Let known search-engine crawlers through
//! - Flag user agents containing automation/scraper markers
//! - Optionally flag requests missing headers every browser sends, on the
//!   paths configured for it
//!
//! # Design Decisions
//! - Allowlist is checked first and wins over every other signal
//! - Case-insensitive substring matching, no regex
//! - Unreadable header values count as absent; detection never errors

use std::fmt;

use axum::http::{header, HeaderMap};

use crate::config::BotDetectionConfig;
use crate::routing::matcher::{matcher_for, Matcher};

/// Why a request was classified as a bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotReason {
    /// User agent contains a denylisted substring.
    UserAgentPattern(String),
    MissingUserAgent,
    MissingAcceptLanguage,
    /// `Origin` sent without `Referer`.
    OriginWithoutReferer,
}

impl fmt::Display for BotReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotReason::UserAgentPattern(p) => write!(f, "user-agent matches {:?}", p),
            BotReason::MissingUserAgent => write!(f, "missing user-agent"),
            BotReason::MissingAcceptLanguage => write!(f, "missing accept-language"),
            BotReason::OriginWithoutReferer => write!(f, "origin without referer"),
        }
    }
}

/// Outcome of bot classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotVerdict {
    /// No bot signals.
    Human,
    /// Matches the crawler allowlist.
    AllowedCrawler,
    /// Classified as an unwanted bot.
    Bot(BotReason),
}

impl BotVerdict {
    pub fn is_bot(&self) -> bool {
        matches!(self, BotVerdict::Bot(_))
    }
}

/// User-agent and header based bot classifier.
#[derive(Debug)]
pub struct BotDetector {
    enabled: bool,
    deny: Vec<String>,
    allow: Vec<String>,
    header_signals: bool,
    /// Empty: header signals apply to every path.
    header_signal_routes: Vec<Box<dyn Matcher>>,
}

impl BotDetector {
    pub fn from_config(config: &BotDetectionConfig) -> Self {
        let lower = |patterns: &[String]| -> Vec<String> {
            patterns.iter().map(|p| p.to_lowercase()).collect()
        };
        Self {
            enabled: config.enabled,
            deny: lower(&config.deny_patterns),
            allow: lower(&config.allow_patterns),
            header_signals: config.header_signals,
            header_signal_routes: config.header_signal_routes.iter().map(matcher_for).collect(),
        }
    }

    fn header_signals_apply(&self, path: &str) -> bool {
        self.header_signals
            && (self.header_signal_routes.is_empty()
                || self.header_signal_routes.iter().any(|m| m.matches(path)))
    }

    /// Classify a request to `path` from its headers.
    pub fn classify(&self, headers: &HeaderMap, path: &str) -> BotVerdict {
        if !self.enabled {
            return BotVerdict::Human;
        }

        let user_agent = header_str(headers, header::USER_AGENT)
            .unwrap_or_default()
            .to_lowercase();

        if !user_agent.is_empty() && self.allow.iter().any(|p| user_agent.contains(p.as_str())) {
            return BotVerdict::AllowedCrawler;
        }

        if let Some(pattern) = self.deny.iter().find(|p| user_agent.contains(p.as_str())) {
            return BotVerdict::Bot(BotReason::UserAgentPattern(pattern.clone()));
        }

        if self.header_signals_apply(path) {
            if user_agent.is_empty() {
                return BotVerdict::Bot(BotReason::MissingUserAgent);
            }
            if header_str(headers, header::ACCEPT_LANGUAGE).is_none() {
                return BotVerdict::Bot(BotReason::MissingAcceptLanguage);
            }
            if header_str(headers, header::ORIGIN).is_some()
                && header_str(headers, header::REFERER).is_none()
            {
                return BotVerdict::Bot(BotReason::OriginWithoutReferer);
            }
        }

        BotVerdict::Human
    }
}

impl Default for BotDetector {
    fn default() -> Self {
        Self::from_config(&BotDetectionConfig::default())
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const API: &str = "/api/generate";

    const BROWSER: &str =
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_browser_is_human() {
        let detector = BotDetector::default();
        let h = headers(&[(header::USER_AGENT, BROWSER)]);
        assert_eq!(detector.classify(&h, API), BotVerdict::Human);
    }

    #[test]
    fn test_denylisted_agents() {
        let detector = BotDetector::default();
        for agent in ["curl/8.4.0", "Wget/1.21", "HeadlessChrome/120", "python-scraper", "AhrefsBot/7.0"] {
            let verdict = detector.classify(&headers(&[(header::USER_AGENT, agent)]), API);
            assert!(verdict.is_bot(), "{agent} should be a bot");
        }
    }

    #[test]
    fn test_allowlist_wins_over_generic_bot_pattern() {
        let detector = BotDetector::default();
        let agent = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
        let verdict = detector.classify(&headers(&[(header::USER_AGENT, agent)]), API);
        assert_eq!(verdict, BotVerdict::AllowedCrawler);

        let strict = BotDetector::from_config(&BotDetectionConfig {
            header_signals: true,
            ..Default::default()
        });
        let verdict = strict.classify(&headers(&[(header::USER_AGENT, "bingbot/2.0")]), API);
        assert_eq!(verdict, BotVerdict::AllowedCrawler);
    }

    #[test]
    fn test_missing_user_agent_is_tolerated_without_header_signals() {
        let detector = BotDetector::default();
        assert_eq!(detector.classify(&HeaderMap::new(), API), BotVerdict::Human);
    }

    #[test]
    fn test_header_signals() {
        let strict = BotDetector::from_config(&BotDetectionConfig {
            header_signals: true,
            ..Default::default()
        });

        assert_eq!(
            strict.classify(&HeaderMap::new(), API),
            BotVerdict::Bot(BotReason::MissingUserAgent)
        );
        assert_eq!(
            strict.classify(&headers(&[(header::USER_AGENT, BROWSER)]), API),
            BotVerdict::Bot(BotReason::MissingAcceptLanguage)
        );
        assert_eq!(
            strict.classify(&headers(&[
                (header::USER_AGENT, BROWSER),
                (header::ACCEPT_LANGUAGE, "en-US"),
                (header::ORIGIN, "https://example.com"),
            ]), API),
            BotVerdict::Bot(BotReason::OriginWithoutReferer)
        );
        assert_eq!(
            strict.classify(&headers(&[
                (header::USER_AGENT, BROWSER),
                (header::ACCEPT_LANGUAGE, "en-US"),
                (header::ORIGIN, "https://example.com"),
                (header::REFERER, "https://example.com/cv"),
            ]), API),
            BotVerdict::Human
        );
    }

    #[test]
    fn test_header_signals_only_on_configured_routes() {
        let strict = BotDetector::from_config(&BotDetectionConfig {
            header_signals: true,
            ..Default::default()
        });
        let bare_browser = headers(&[(header::USER_AGENT, BROWSER)]);

        assert!(strict.classify(&bare_browser, "/api/download/docx").is_bot());
        assert_eq!(strict.classify(&bare_browser, "/download"), BotVerdict::Human);
        assert_eq!(strict.classify(&HeaderMap::new(), "/generate"), BotVerdict::Human);
        // User-agent patterns still apply everywhere.
        let curl = headers(&[(header::USER_AGENT, "curl/8.4.0")]);
        assert!(strict.classify(&curl, "/download").is_bot());

        let everywhere = BotDetector::from_config(&BotDetectionConfig {
            header_signals: true,
            header_signal_routes: Vec::new(),
            ..Default::default()
        });
        assert_eq!(
            everywhere.classify(&bare_browser, "/download"),
            BotVerdict::Bot(BotReason::MissingAcceptLanguage)
        );
    }

    #[test]
    fn test_disabled_detector_never_flags() {
        let detector = BotDetector::from_config(&BotDetectionConfig {
            enabled: false,
            ..Default::default()
        });
        let verdict = detector.classify(&headers(&[(header::USER_AGENT, "curl/8.4.0")]), API);
        assert_eq!(verdict, BotVerdict::Human);
    }
}
