//! Client identifier extraction.
//!
//! # Design Decisions
//! - Peer IP by default
//! - `X-Forwarded-For` only when explicitly trusted: a client can put
//!   anything in it and rotate identities at will
//! - Falls back to a shared "unknown" bucket rather than failing

use std::net::SocketAddr;

use axum::http::HeaderMap;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Identifier used when neither the header nor the peer address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the rate-limit key for a request.
pub fn client_identifier(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').map(str::trim).find(|s| !s.is_empty()));
        if let Some(client) = forwarded {
            return client.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_peer_ip_without_port() {
        let peer: SocketAddr = "10.1.2.3:54321".parse().unwrap();
        assert_eq!(
            client_identifier(&HeaderMap::new(), Some(peer), false),
            "10.1.2.3"
        );
    }

    #[test]
    fn test_forwarded_for_ignored_unless_trusted() {
        let peer: SocketAddr = "10.1.2.3:80".parse().unwrap();
        let headers = forwarded("203.0.113.7, 10.0.0.1");
        assert_eq!(client_identifier(&headers, Some(peer), false), "10.1.2.3");
        assert_eq!(client_identifier(&headers, Some(peer), true), "203.0.113.7");
    }

    #[test]
    fn test_blank_forwarded_for_falls_back() {
        let peer: SocketAddr = "[::1]:80".parse().unwrap();
        assert_eq!(client_identifier(&forwarded(" , "), Some(peer), true), "::1");
        assert_eq!(client_identifier(&HeaderMap::new(), None, true), UNKNOWN_CLIENT);
    }
}
