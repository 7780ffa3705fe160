use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::rate_limit::client_ip;

/// Allow-list gate for admin-prefixed routes. Independent of rate
/// limiting; runs after it in the edge stack.
pub struct IpWhitelist {
    allowed: HashSet<String>,
}

impl IpWhitelist {
    pub fn new(allowed_ips: Vec<String>) -> Self {
        Self {
            allowed: allowed_ips.into_iter().collect(),
        }
    }

    pub fn is_allowed(&self, ip: &str) -> bool {
        self.allowed.contains(ip)
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

pub async fn ip_whitelist_middleware(
    State(whitelist): State<Arc<IpWhitelist>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !request.uri().path().starts_with("/admin") {
        return Ok(next.run(request).await);
    }

    let headers = request.headers().clone();
    let ip = client_ip(&headers, &request);
    if whitelist.is_allowed(&ip) {
        debug!("Admin route access granted for {}", ip);
        Ok(next.run(request).await)
    } else {
        warn!("Admin route access denied for {}", ip);
        Err(StatusCode::FORBIDDEN)
    }
}
