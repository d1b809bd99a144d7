//! CSRF token cache for one backend client instance
//!
//! The backend requires a security token on state-changing requests only.
//! Lifecycle per client instance:
//!
//! ```text
//! NoToken -(mutating call)-> fetching -> HasToken | NotRequired
//!                                           |
//!                (profile switch or backend rejection)
//!                                           v
//!                                        NoToken
//! ```
//!
//! "fetching" is not a stored state - it is the in-flight GET performed by
//! the client while the cache still reads `NoToken`. The cache dies with its
//! client instance on profile switch.

use parking_lot::RwLock;
use reqwest::header::HeaderMap;

/// Header under which the token is requested and attached
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Sentinel request value asking the backend to issue a token
pub const CSRF_FETCH_SENTINEL: &str = "Fetch";

/// Response header names the token may arrive under, checked in order
///
/// `HeaderMap` lookups are case-insensitive, so the variants differing only
/// by case collapse to the same probe; they are kept spelled out because the
/// backend fleet has shipped every one of them at some point.
const CSRF_RESPONSE_HEADERS: [&str; 5] = [
    "X-CSRF-Token",
    "x-csrf-token",
    "X-Csrf-Token",
    "csrf-token",
    "CSRF-Token",
];

/// Cached token state for one backend client instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsrfState {
    /// No fetch attempted yet (or cache invalidated)
    NoToken,
    /// Token fetched and reusable until invalidated
    HasToken(String),
    /// The backend answered the fetch without a token - this configuration
    /// does not enforce CSRF, so mutating calls proceed without the header
    NotRequired,
}

/// Per-client cache of a single security token
#[derive(Debug)]
pub struct CsrfTokenManager {
    state: RwLock<CsrfState>,
}

impl CsrfTokenManager {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CsrfState::NoToken),
        }
    }

    /// Current cached state
    #[must_use]
    pub fn cached(&self) -> CsrfState {
        self.state.read().clone()
    }

    /// Record the outcome of a token fetch
    pub fn store(&self, token: Option<String>) {
        *self.state.write() = match token {
            Some(value) => CsrfState::HasToken(value),
            None => CsrfState::NotRequired,
        };
    }

    /// Drop the cached token; the next mutating call fetches again
    pub fn invalidate(&self) {
        *self.state.write() = CsrfState::NoToken;
    }

    /// Extract a token from response headers, probing every accepted name
    #[must_use]
    pub fn extract_token(headers: &HeaderMap) -> Option<String> {
        CSRF_RESPONSE_HEADERS.iter().find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(CSRF_FETCH_SENTINEL))
                .map(ToString::to_string)
        })
    }
}

impl Default for CsrfTokenManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn starts_without_a_token() {
        let manager = CsrfTokenManager::new();
        assert_eq!(manager.cached(), CsrfState::NoToken);
    }

    #[test]
    fn stores_and_invalidates() {
        let manager = CsrfTokenManager::new();
        manager.store(Some("abc123".to_string()));
        assert_eq!(manager.cached(), CsrfState::HasToken("abc123".to_string()));

        manager.invalidate();
        assert_eq!(manager.cached(), CsrfState::NoToken);
    }

    #[test]
    fn absent_token_is_remembered_as_not_required() {
        let manager = CsrfTokenManager::new();
        manager.store(None);
        assert_eq!(manager.cached(), CsrfState::NotRequired);
    }

    #[test]
    fn extracts_token_regardless_of_header_case() {
        for name in ["x-csrf-token", "X-CSRF-Token", "csrf-token"] {
            let mut headers = HeaderMap::new();
            headers.insert(name, HeaderValue::from_static("tok-1"));
            assert_eq!(
                CsrfTokenManager::extract_token(&headers),
                Some("tok-1".to_string()),
                "failed for header name {name}"
            );
        }
    }

    #[test]
    fn ignores_empty_and_sentinel_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-csrf-token", HeaderValue::from_static(""));
        assert_eq!(CsrfTokenManager::extract_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert("x-csrf-token", HeaderValue::from_static("fetch"));
        assert_eq!(CsrfTokenManager::extract_token(&headers), None);
    }

    #[test]
    fn missing_header_yields_none() {
        assert_eq!(CsrfTokenManager::extract_token(&HeaderMap::new()), None);
    }
}
