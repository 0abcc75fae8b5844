use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Most callers tracked at once. At the limit expired windows are swept, then
/// the oldest live window is evicted.
const MAX_TRACKED_IDENTITIES: usize = 1024;

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter keyed by caller identity.
///
/// The identity is the socket peer address unless proxy headers are trusted.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    trust_proxy_headers: bool,
    windows: Arc<Mutex<HashMap<String, RateLimitWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            trust_proxy_headers: false,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Key on `x-forwarded-for`/`x-real-ip` when present. Only for deployments
    /// behind a proxy that overwrites those headers.
    #[must_use]
    pub fn with_proxy_headers(mut self, trusted: bool) -> Self {
        self.trust_proxy_headers = trusted;
        self
    }

    #[must_use]
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Counts one request for `identity`. Over quota, returns the whole
    /// seconds until its window resets (at least 1).
    async fn admit(&self, identity: &str) -> Result<(), u64> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if !windows.contains_key(identity) && windows.len() >= MAX_TRACKED_IDENTITIES {
            windows.retain(|_, w| now.duration_since(w.started_at) < self.window);
            if windows.len() >= MAX_TRACKED_IDENTITIES {
                let oldest = windows
                    .iter()
                    .min_by_key(|(_, w)| w.started_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    windows.remove(&oldest);
                }
            }
        }

        let window = windows
            .entry(identity.to_owned())
            .or_insert(RateLimitWindow {
                started_at: now,
                count: 0,
            });

        let elapsed = now.duration_since(window.started_at);
        if elapsed >= self.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.max_requests {
            let remaining = self.window.saturating_sub(now.duration_since(window.started_at));
            let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(secs.max(1));
        }

        window.count += 1;
        Ok(())
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing a per-identity request quota.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let identity = client_identity(req.headers(), peer, rate_limit.trust_proxy_headers);

    if let Err(retry_after) = rate_limit.admit(&identity).await {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();
        tracing::warn!(
            identity = %identity,
            path = %req.uri().path(),
            retry_after,
            "rate limit exceeded"
        );
        return ApiError::rate_limited(request_id, retry_after).into_response();
    }

    next.run(req).await
}

/// The socket peer, or with `trust_proxy_headers` the first `x-forwarded-for`
/// hop, then `x-real-ip`, then the peer.
fn client_identity(
    headers: &HeaderMap,
    peer: Option<String>,
    trust_proxy_headers: bool,
) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned)
    };

    let forwarded = if trust_proxy_headers {
        header("x-forwarded-for").or_else(|| header("x-real-ip"))
    } else {
        None
    };

    forwarded.or(peer).unwrap_or_else(|| "unknown".to_owned())
}
