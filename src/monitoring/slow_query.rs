use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{PatternAggregator, QueryAnalyzer, QueryOperation, QueryPatternStats};
use crate::config::MonitoringConfig;

/// Optional caller-supplied context for a logged slow query.
#[derive(Debug, Clone, Default)]
pub struct SlowQueryContext {
    pub query_plan: Option<String>,
    pub parameters: Option<serde_json::Value>,
    pub user_id: Option<String>,
    pub row_count: Option<u64>,
}

/// One logged slow query. Immutable once created; evicted oldest-first
/// when the log exceeds its capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowQueryLogEntry {
    pub id: String,
    pub query: String,
    pub table: String,
    pub operation: QueryOperation,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// Bounded in-memory log of slow queries plus the per-pattern aggregate.
///
/// All state is process-local and disposable; the relational backend is
/// the source of truth for everything this log describes.
pub struct SlowQueryLog {
    config: MonitoringConfig,
    entries: Arc<RwLock<VecDeque<SlowQueryLogEntry>>>,
    patterns: Arc<RwLock<PatternAggregator>>,
    http: reqwest::Client,
}

impl SlowQueryLog {
    pub fn new(config: MonitoringConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            config,
            entries: Arc::new(RwLock::new(VecDeque::new())),
            patterns: Arc::new(RwLock::new(PatternAggregator::new())),
            http,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn threshold_ms(&self) -> u64 {
        self.config.slow_query_threshold_ms
    }

    /// Record a query outcome. Returns `None` (no-op) when logging is
    /// disabled or the duration does not exceed the configured threshold.
    pub async fn log(
        &self,
        query: &str,
        table: &str,
        operation: QueryOperation,
        duration_ms: u64,
        context: SlowQueryContext,
    ) -> Option<SlowQueryLogEntry> {
        if !self.config.enabled || duration_ms <= self.config.slow_query_threshold_ms {
            return None;
        }

        let analysis = QueryAnalyzer::analyze(query, table, operation, duration_ms);

        let entry = SlowQueryLogEntry {
            // Time plus a random suffix; uniqueness is best-effort.
            id: format!(
                "{}-{:04x}",
                Utc::now().timestamp_millis(),
                rand::random::<u16>()
            ),
            query: query.to_string(),
            table: table.to_string(),
            operation,
            duration_ms,
            timestamp: Utc::now(),
            stack_trace: self
                .config
                .capture_stack_trace
                .then(|| std::backtrace::Backtrace::force_capture().to_string()),
            query_plan: if self.config.capture_query_plan {
                context.query_plan
            } else {
                None
            },
            parameters: context.parameters,
            user_id: context.user_id,
            row_count: context.row_count,
            recommendation: analysis.recommendations.first().cloned(),
        };

        debug!(
            table = %table,
            operation = %operation,
            duration_ms,
            "Logged slow query {}",
            entry.id
        );

        {
            let mut entries = self.entries.write().await;
            entries.push_back(entry.clone());
            while entries.len() > self.config.max_log_entries {
                entries.pop_front();
            }
        }

        {
            let mut patterns = self.patterns.write().await;
            patterns.record(table, operation, duration_ms, query);
        }

        if let Some(endpoint) = &self.config.metrics_endpoint {
            self.export_entry(endpoint.clone(), entry.clone());
        }

        Some(entry)
    }

    /// Best-effort fire-and-forget POST to the external metrics endpoint.
    /// Failure is logged and never surfaced to the logging caller.
    fn export_entry(&self, endpoint: String, entry: SlowQueryLogEntry) {
        let client = self.http.clone();
        tokio::spawn(async move {
            match client.post(&endpoint).json(&entry).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Exported slow query {} to metrics endpoint", entry.id);
                }
                Ok(response) => {
                    warn!(
                        "Metrics endpoint rejected slow query {}: HTTP {}",
                        entry.id,
                        response.status()
                    );
                }
                Err(e) => {
                    warn!("Failed to export slow query {}: {}", entry.id, e);
                }
            }
        });
    }

    /// Entries in log order, oldest first.
    pub async fn entries(&self) -> Vec<SlowQueryLogEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// The most recent `limit` entries, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<SlowQueryLogEntry> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn pattern_stats(&self) -> Vec<QueryPatternStats> {
        self.patterns.read().await.snapshot()
    }

    /// Drop the log and all pattern statistics.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        self.patterns.write().await.clear();
        info!("Cleared slow-query log and pattern statistics");
    }
}
