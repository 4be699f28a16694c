//! Credential transports.
//!
//! A request may carry its session token in the Authorization header
//! (native/mobile clients) or in a `token` cookie (browser clients sharing
//! the same backend). Sources are tried in priority order and the first hit
//! wins: header beats cookie, so a mobile caller dragging a stale cookie
//! along is not short-circuited by it. A third transport slots in by adding
//! one entry to the list.

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Cookie name used by browser clients.
pub const TOKEN_COOKIE: &str = "token";

/// One way a request can present a credential.
pub trait CredentialSource: Send + Sync {
    /// Try to pull a token out of the request headers. `None` means this
    /// transport was not used, not that the request is invalid.
    fn attempt(&self, headers: &HeaderMap) -> Option<String>;
}

/// `Authorization: Bearer <token>`.
pub struct BearerHeader;

impl CredentialSource for BearerHeader {
    fn attempt(&self, headers: &HeaderMap) -> Option<String> {
        let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let token = raw.strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }
}

/// `Cookie: token=<token>`.
pub struct TokenCookie;

impl CredentialSource for TokenCookie {
    fn attempt(&self, headers: &HeaderMap) -> Option<String> {
        let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
        let s = cookie.to_str().ok()?;
        for part in s.split(';') {
            let p = part.trim();
            if let Some(eq) = p.find('=') {
                let (name, value) = p.split_at(eq);
                if name == TOKEN_COOKIE && value.len() > 1 {
                    return Some(value[1..].to_string());
                }
            }
        }
        None
    }
}

/// Try each transport in priority order. Absent everywhere means the caller
/// is unauthenticated, not that the request errored.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let sources: [&dyn CredentialSource; 2] = [&BearerHeader, &TokenCookie];
    sources.iter().find_map(|s| s.attempt(headers))
}
