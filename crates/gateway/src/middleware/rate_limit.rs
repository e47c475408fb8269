//! Rate limiting middleware.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use common::AppError;

use crate::services::{Admission, RateLimiter};
use crate::state::AppState;

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Rate limit middleware for general endpoints.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(request.headers(), connect_info, state.config.trust_proxy_headers);
    rate_limit_internal(&state.rate_limiter, key, request, next).await
}

/// Rate limit middleware for credential endpoints (stricter).
pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(request.headers(), connect_info, state.config.trust_proxy_headers);
    rate_limit_internal(&state.auth_rate_limiter, key, request, next).await
}

async fn rate_limit_internal(
    limiter: &RateLimiter,
    key: String,
    request: Request<Body>,
    next: Next,
) -> Response {
    match limiter.admit(&key, Instant::now()) {
        Admission::Rejected {
            limit,
            retry_after_secs,
        } => {
            warn!(client = %key, path = %request.uri().path(), retry_after_secs, "Rate limit exceeded");
            let mut response = AppError::TooManyRequests { retry_after_secs }.into_response();
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(0u64));
            response
        }
        Admission::Admitted { limit, remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            response
        }
    }
}

/// Key used to count a client's requests.
///
/// `X-Forwarded-For` (first hop) and `X-Real-IP` count only when
/// `trust_proxy_headers` is set; otherwise the peer address is used.
pub fn client_key(
    headers: &HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
