//! # API Key Guard
//!
//! When `SLP_API_KEY` is set at router construction, every route except the
//! public ones needs `Authorization: Bearer <key>`. The raw key without the
//! `Bearer ` prefix is accepted too.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "SLP_API_KEY";

/// Routes reachable without a key (health checks).
const PUBLIC_PATHS: &[&str] = &["/health"];

/// The configured key, read once when the router is built.
#[derive(Clone)]
pub struct ApiKey(Arc<[u8]>);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(..)")
    }
}

impl ApiKey {
    pub fn new(key: &str) -> Self {
        Self(Arc::from(key.as_bytes()))
    }

    /// `None` when the variable is unset or empty, which disables the guard.
    pub fn from_env() -> Option<Self> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .map(|k| Self::new(&k))
    }

    /// Constant-time comparison; a length difference never short-circuits.
    pub fn matches(&self, provided: &[u8]) -> bool {
        let expected: &[u8] = &self.0;
        let width = provided.len().max(expected.len());
        let mut lhs = vec![0u8; width];
        let mut rhs = vec![0u8; width];
        lhs[..provided.len()].copy_from_slice(provided);
        rhs[..expected.len()].copy_from_slice(expected);

        let same_bytes: bool = lhs.ct_eq(&rhs).into();
        same_bytes & (provided.len() == expected.len())
    }
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    Some(value.strip_prefix("Bearer ").unwrap_or(value))
}

/// Middleware installed with `from_fn_with_state(ApiKey, require_api_key)`.
pub async fn require_api_key(
    State(key): State<ApiKey>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let rejection = match presented_key(request.headers()) {
        Some(provided) if key.matches(provided.as_bytes()) => None,
        Some(_) => Some("invalid_api_key"),
        None => Some("missing_authorization_header"),
    };
    let Some(reason) = rejection else {
        return Ok(next.run(request).await);
    };

    tracing::warn!(
        event = "auth_failure",
        reason,
        path = %request.uri().path(),
        "Request rejected"
    );
    Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn equal_keys_match() {
        assert!(ApiKey::new("secret").matches(b"secret"));
    }

    #[test]
    fn prefix_or_padding_does_not_match() {
        let key = ApiKey::new("secret");
        assert!(!key.matches(b"secre"));
        assert!(!key.matches(b"secret\0"));
        assert!(!key.matches(b""));
    }

    #[test]
    fn bearer_prefix_is_optional() {
        let mut headers = HeaderMap::new();
        assert_eq!(presented_key(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer k1"));
        assert_eq!(presented_key(&headers), Some("k1"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("k2"));
        assert_eq!(presented_key(&headers), Some("k2"));
    }

    #[test]
    fn debug_hides_key() {
        assert_eq!(format!("{:?}", ApiKey::new("secret")), "ApiKey(..)");
    }
}
