use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::AppState;
use crate::monitoring::{render_slow_query_csv, ExportPayload};
use crate::security::SecurityConfig;

const RECENT_ALERT_LIMIT: usize = 100;
const RECENT_ENTRY_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MonitoringAction {
    pub action: String,
}

/// The monitoring endpoint requires an authenticated caller; session
/// auth lives upstream, so the check here is the forwarded API key.
fn authorize(security: &SecurityConfig, headers: &HeaderMap) -> Result<(), StatusCode> {
    if !security.require_auth {
        return Ok(());
    }
    let key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if security.api_keys.iter().any(|k| k == key) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

/// `GET /api/monitoring/metrics?type=...&format=...`
pub async fn get_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricsQuery>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&state.config.security, &headers)?;

    let kind = params.kind.as_deref().unwrap_or("summary");
    match kind {
        "summary" => {
            let health = state.connections.health_summary().await;
            let patterns = state.slow_queries.pattern_stats().await;
            let rate_limits = state.rate_limiter.statistics().await;
            Ok(Json(json!({
                "timestamp": chrono::Utc::now(),
                "health": health,
                "slowQueries": {
                    "count": state.slow_queries.len().await,
                    "topPatterns": patterns.into_iter().take(5).collect::<Vec<_>>(),
                },
                "rateLimits": rate_limits,
            }))
            .into_response())
        }
        "queries" => {
            let patterns = state.slow_queries.pattern_stats().await;
            Ok(Json(patterns).into_response())
        }
        "connections" => {
            let history = state.connections.metrics_history(60).await;
            Ok(Json(history).into_response())
        }
        "slow-queries" => {
            let entries = state.slow_queries.recent(RECENT_ENTRY_LIMIT).await;
            Ok(Json(json!({
                "count": state.slow_queries.len().await,
                "entries": entries,
            }))
            .into_response())
        }
        "health" => {
            state.connections.sample().await;
            let summary = state.connections.health_summary().await;
            Ok(Json(summary).into_response())
        }
        "export" => {
            let entries = state.slow_queries.entries().await;
            match params.format.as_deref().unwrap_or("json") {
                "csv" => {
                    let body = render_slow_query_csv(&entries);
                    Ok(([(header::CONTENT_TYPE, "text/csv")], body).into_response())
                }
                "json" => {
                    let payload = ExportPayload::new(
                        state.connections.health_summary().await,
                        state.slow_queries.pattern_stats().await,
                        entries,
                        state.connections.recent_alerts(RECENT_ALERT_LIMIT).await,
                    );
                    Ok(Json(payload).into_response())
                }
                _ => Err(StatusCode::BAD_REQUEST),
            }
        }
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

/// `POST /api/monitoring/metrics` with `{"action": ...}`
pub async fn post_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<MonitoringAction>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state.config.security, &headers)?;

    match body.action.as_str() {
        "health-check" => {
            state.connections.sample().await;
            let summary = state.connections.health_summary().await;
            Ok(Json(json!({
                "status": "ok",
                "health": summary,
            })))
        }
        "clear-logs" => {
            state.slow_queries.clear().await;
            state.connections.clear_history().await;
            info!("Monitoring logs cleared on request");
            Ok(Json(json!({
                "status": "success",
                "message": "Monitoring logs cleared",
            })))
        }
        _ => Err(StatusCode::BAD_REQUEST),
    }
}
