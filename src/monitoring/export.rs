use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Alert, HealthSummary, QueryPatternStats, SlowQueryLogEntry};

/// Full JSON export of the in-memory monitoring state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub export_date: DateTime<Utc>,
    pub health: HealthSummary,
    pub queries: Vec<QueryPatternStats>,
    pub slow_queries: Vec<SlowQueryLogEntry>,
    pub alerts: Vec<Alert>,
}

impl ExportPayload {
    pub fn new(
        health: HealthSummary,
        queries: Vec<QueryPatternStats>,
        slow_queries: Vec<SlowQueryLogEntry>,
        alerts: Vec<Alert>,
    ) -> Self {
        Self {
            export_date: Utc::now(),
            health,
            queries,
            slow_queries,
            alerts,
        }
    }
}

/// Render slow-query entries as CSV. The query text is quoted, with
/// embedded quotes escaped by doubling.
pub fn render_slow_query_csv(entries: &[SlowQueryLogEntry]) -> String {
    let mut out = String::from("Timestamp,Table,Operation,Duration (ms),Query\n");
    for entry in entries {
        out.push_str(&format!(
            "{},{},{},{},\"{}\"\n",
            entry.timestamp.to_rfc3339(),
            entry.table,
            entry.operation,
            entry.duration_ms,
            entry.query.replace('"', "\"\"")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::QueryOperation;

    fn entry(query: &str) -> SlowQueryLogEntry {
        SlowQueryLogEntry {
            id: "1700000000000-00ff".to_string(),
            query: query.to_string(),
            table: "contacts".to_string(),
            operation: QueryOperation::Select,
            duration_ms: 1500,
            timestamp: Utc::now(),
            stack_trace: None,
            query_plan: None,
            parameters: None,
            user_id: None,
            row_count: None,
            recommendation: None,
        }
    }

    #[test]
    fn test_csv_header() {
        let csv = render_slow_query_csv(&[]);
        assert_eq!(csv, "Timestamp,Table,Operation,Duration (ms),Query\n");
    }

    #[test]
    fn test_csv_row_fields() {
        let csv = render_slow_query_csv(&[entry("select id from contacts limit 1")]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains(",contacts,select,1500,"));
        assert!(row.ends_with("\"select id from contacts limit 1\""));
    }

    #[test]
    fn test_csv_doubles_embedded_quotes() {
        let csv = render_slow_query_csv(&[entry(r#"select id from contacts where name = "Ada""#)]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(r#""select id from contacts where name = ""Ada""""#));
    }
}
