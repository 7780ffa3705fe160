use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{RateLimitConfig, Result, RouteClass, SecurityError};

/// The identity dimension a bucket counts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeyKind {
    Ip,
    User,
    ApiKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    class: RouteClass,
    kind: KeyKind,
    identity: String,
}

#[derive(Debug)]
struct WindowBucket {
    window_start: Instant,
    count: u32,
}

/// Fixed-window admission control.
///
/// Each (route class, identity) pair owns an independent counter. The
/// first request in a window (or the first after expiry) starts a new
/// window at count 1 and is admitted; subsequent requests increment the
/// counter and are admitted while it stays within the class maximum.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<RwLock<HashMap<BucketKey, WindowBucket>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Check every identity dimension configured for the route class.
    /// Rejection of any dimension rejects the request.
    pub async fn check_request(
        &self,
        class: RouteClass,
        ip: &str,
        user_id: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let rule = self.config.rule(class).clone();
        let window = Duration::from_secs(rule.window_secs);

        if rule.per_ip_max > 0 {
            self.admit(class, KeyKind::Ip, ip, rule.per_ip_max, window)
                .await?;
        }
        if rule.per_user_max > 0 {
            if let Some(user_id) = user_id {
                self.admit(class, KeyKind::User, user_id, rule.per_user_max, window)
                    .await?;
            }
        }
        if rule.per_api_key_max > 0 {
            if let Some(api_key) = api_key {
                self.admit(class, KeyKind::ApiKey, api_key, rule.per_api_key_max, window)
                    .await?;
            }
        }

        Ok(())
    }

    async fn admit(
        &self,
        class: RouteClass,
        kind: KeyKind,
        identity: &str,
        max: u32,
        window: Duration,
    ) -> Result<()> {
        let key = BucketKey {
            class,
            kind,
            identity: identity.to_string(),
        };
        let now = Instant::now();

        let mut buckets = self.buckets.write().await;
        let bucket = buckets.entry(key).or_insert(WindowBucket {
            window_start: now,
            count: 0,
        });

        if now.duration_since(bucket.window_start) >= window {
            bucket.window_start = now;
            bucket.count = 1;
            return Ok(());
        }

        bucket.count += 1;
        if bucket.count <= max {
            Ok(())
        } else {
            warn!(
                "Rate limit exceeded for {} {:?} key in class {}",
                identity, kind, class
            );
            Err(SecurityError::RateLimitExceeded)
        }
    }

    /// Drop buckets whose window has elapsed.
    pub async fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|key, bucket| {
            let window = Duration::from_secs(self.config.rule(key.class).window_secs);
            now.duration_since(bucket.window_start) < window
        });
        before - buckets.len()
    }

    pub async fn statistics(&self) -> RateLimitStatistics {
        let buckets = self.buckets.read().await;
        let mut active_by_class: HashMap<String, usize> = HashMap::new();
        for key in buckets.keys() {
            *active_by_class.entry(key.class.to_string()).or_default() += 1;
        }
        RateLimitStatistics {
            enabled: self.config.enabled,
            active_buckets: buckets.len(),
            active_by_class,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RateLimitStatistics {
    pub enabled: bool,
    pub active_buckets: usize,
    pub active_by_class: HashMap<String, usize>,
}

/// Classify a request path into its admission route class.
pub fn classify_route(path: &str) -> RouteClass {
    if path.starts_with("/api/auth") {
        RouteClass::Auth
    } else if path.starts_with("/api/webhooks") {
        RouteClass::Webhook
    } else if path.starts_with("/api/") {
        RouteClass::Api
    } else {
        RouteClass::General
    }
}

/// Best-effort client IP: the forwarding header set by the edge proxy,
/// falling back to the socket address.
pub(crate) fn client_ip(headers: &HeaderMap, request: &Request) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware. Runs first in the edge stack, before the
/// IP whitelist and security headers.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, StatusCode> {
    if !rate_limiter.is_enabled() {
        return Ok(next.run(request).await);
    }

    let headers = request.headers().clone();
    let ip = client_ip(&headers, &request);
    let user_id = headers.get("x-user-id").and_then(|v| v.to_str().ok());
    let api_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    let class = classify_route(request.uri().path());

    match rate_limiter
        .check_request(class, &ip, user_id, api_key)
        .await
    {
        Ok(()) => {
            debug!("Admission checks passed for {} on class {}", ip, class);
            Ok(next.run(request).await)
        }
        Err(SecurityError::RateLimitExceeded) => Err(StatusCode::TOO_MANY_REQUESTS),
        Err(_) => Err(StatusCode::FORBIDDEN),
    }
}
