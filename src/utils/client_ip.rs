//! Client address resolution for click attribution.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Resolves the originating client address of a request.
///
/// When `behind_proxy` is set, the first entry of `X-Forwarded-For` wins,
/// then `X-Real-IP`. Otherwise (or if neither header is usable) the socket
/// peer address is used. Only enable `behind_proxy` behind a trusted reverse
/// proxy; the headers are client-controlled.
pub fn resolve_client_ip(headers: &HeaderMap, peer: SocketAddr, behind_proxy: bool) -> String {
    if behind_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    peer.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "198.51.100.7:40000".parse().unwrap()
    }

    #[test]
    fn test_peer_address_used_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.5"));

        assert_eq!(resolve_client_ip(&headers, peer(), false), "198.51.100.7");
    }

    #[test]
    fn test_first_forwarded_entry_behind_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));

        assert_eq!(resolve_client_ip(&headers, peer(), true), "203.0.113.5");
    }

    #[test]
    fn test_real_ip_fallback_behind_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.9"));

        assert_eq!(resolve_client_ip(&headers, peer(), true), "203.0.113.9");
    }

    #[test]
    fn test_peer_fallback_without_headers() {
        assert_eq!(
            resolve_client_ip(&HeaderMap::new(), peer(), true),
            "198.51.100.7"
        );
    }
}
