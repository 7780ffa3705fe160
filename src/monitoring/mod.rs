pub mod analyzer;
pub mod export;
pub mod health;
pub mod patterns;
pub mod slow_query;

pub use analyzer::{ImprovementEstimate, QueryAnalysisResult, QueryAnalyzer};
pub use export::{render_slow_query_csv, ExportPayload};
pub use health::{ConnectionMonitor, ConnectionSample, HealthSummary, HealthThresholds};
pub use patterns::{PatternAggregator, QueryPatternStats};
pub use slow_query::{SlowQueryContext, SlowQueryLog, SlowQueryLogEntry};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// A single threshold-violation record.
///
/// Alerts are append-only and never deduplicated: a sustained breach
/// produces one alert per sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
}

/// The kind of database operation a query performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOperation {
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
    Rpc,
}

impl fmt::Display for QueryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryOperation::Select => "select",
            QueryOperation::Insert => "insert",
            QueryOperation::Update => "update",
            QueryOperation::Delete => "delete",
            QueryOperation::Upsert => "upsert",
            QueryOperation::Rpc => "rpc",
        };
        write!(f, "{s}")
    }
}
