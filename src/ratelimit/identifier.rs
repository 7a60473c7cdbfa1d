//! Client Identifier
//!
//! Derives the rate-limit identity of a request from proxy headers and the
//! user agent.

use axum::http::HeaderMap;

/// Characters of the user agent kept in the identifier.
const USER_AGENT_PREFIX_LEN: usize = 50;

const UNKNOWN: &str = "unknown";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Client IP: first `x-forwarded-for` hop, then `x-real-ip`, else "unknown".
pub fn client_ip(headers: &HeaderMap) -> &str {
    if let Some(forwarded) = header(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next().map(str::trim) {
            if !first.is_empty() {
                return first;
            }
        }
    }
    header(headers, "x-real-ip").unwrap_or(UNKNOWN)
}

// == Get Identifier ==
/// `{ip}:{first 50 chars of user agent}`. The user agent separates clients
/// that share a proxy address.
pub fn get_identifier(headers: &HeaderMap) -> String {
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(UNKNOWN);
    let fingerprint: String = user_agent.chars().take(USER_AGENT_PREFIX_LEN).collect();

    format!("{}:{}", client_ip(headers), fingerprint)
}
