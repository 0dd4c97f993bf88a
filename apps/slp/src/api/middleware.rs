//! # Rate Limiting
//!
//! One process-wide token bucket shared by every route. `SLP_RATE_LIMIT`
//! sets the budget in requests per second; `0` turns the limiter off and an
//! unset or unparsable value means 100. Rejections carry `Retry-After`.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Environment variable holding the rate limit.
pub const RATE_LIMIT_ENV: &str = "SLP_RATE_LIMIT";

const DEFAULT_RPS: NonZeroU32 = NonZeroU32::MIN.saturating_add(99);

pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Parse a configured budget. `None` disables limiting.
fn parse_rate_limit(raw: Option<&str>) -> Option<NonZeroU32> {
    match raw.map(str::trim).map(str::parse::<u32>) {
        Some(Ok(rps)) => NonZeroU32::new(rps),
        Some(Err(_)) | None => Some(DEFAULT_RPS),
    }
}

/// Budget from `SLP_RATE_LIMIT`, or `None` when it is `0`.
pub fn rate_limit_from_env() -> Option<NonZeroU32> {
    parse_rate_limit(std::env::var(RATE_LIMIT_ENV).ok().as_deref())
}

pub fn create_rate_limiter(requests_per_second: NonZeroU32) -> GlobalRateLimiter {
    Arc::new(RateLimiter::direct(Quota::per_second(requests_per_second)))
}

/// Middleware installed with `from_fn_with_state(limiter, rate_limit_middleware)`.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let wait = match limiter.check() {
        Ok(()) => return next.run(request).await,
        Err(not_until) => not_until.wait_time_from(limiter.clock().now()),
    };
    // Whole seconds, rounded up so clients never retry early.
    let retry_after = wait.as_secs().saturating_add(1);

    tracing::warn!(
        event = "rate_limited",
        path = %request.uri().path(),
        retry_after,
        "Request rejected"
    );
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, retry_after.to_string())],
        "Too Many Requests",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_garbage_uses_default() {
        assert_eq!(parse_rate_limit(None), Some(DEFAULT_RPS));
        assert_eq!(parse_rate_limit(Some("fast")), Some(DEFAULT_RPS));
        assert_eq!(DEFAULT_RPS.get(), 100);
    }

    #[test]
    fn zero_disables_limiting() {
        assert_eq!(parse_rate_limit(Some("0")), None);
        assert_eq!(parse_rate_limit(Some(" 25 ")).map(NonZeroU32::get), Some(25));
    }

    #[test]
    fn single_request_budget_is_enforced() {
        let limiter = create_rate_limiter(NonZeroU32::MIN);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
