pub mod monitoring_api;

use axum::{
    http::HeaderValue,
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::monitoring::{ConnectionMonitor, SlowQueryLog};
use crate::security::{
    ip_whitelist_middleware, rate_limit_middleware, security_headers_middleware, IpWhitelist,
    RateLimiter,
};
use crate::webhook::WebhookEmitter;

/// Application state for the monitoring API.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub slow_queries: Arc<SlowQueryLog>,
    pub connections: Arc<ConnectionMonitor>,
    pub rate_limiter: Arc<RateLimiter>,
    pub ip_whitelist: Arc<IpWhitelist>,
    pub webhooks: Arc<WebhookEmitter>,
}

/// Create the API router with the edge middleware stack. Layers apply
/// outermost-first: rate limit, then IP whitelist, then security
/// headers, then routing.
pub fn create_router(state: AppState) -> Router {
    let rate_limiter = state.rate_limiter.clone();
    let ip_whitelist = state.ip_whitelist.clone();
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/api/health", get(liveness))
        .route(
            "/api/monitoring/metrics",
            get(monitoring_api::get_metrics).post(monitoring_api::post_metrics),
        )
        .with_state(state)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn_with_state(
            ip_whitelist,
            ip_whitelist_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    }
}

/// Liveness endpoint
async fn liveness() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "crm-monitor",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
