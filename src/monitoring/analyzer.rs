use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::QueryOperation;

/// Coarse categorical estimate of how much a query could improve,
/// mapped from duration magnitude alone. Nothing here is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImprovementEstimate {
    Low,
    Moderate,
    Significant,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysisResult {
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub estimated_improvement: ImprovementEstimate,
    pub suggested_indexes: Vec<String>,
}

struct Heuristics {
    where_clause: Regex,
    where_eq_column: Regex,
    sdk_eq_column: Regex,
    order_by_column: Regex,
    sdk_order_column: Regex,
    select_star: Regex,
    sdk_select_star: Regex,
    join_clause: Regex,
    in_subselect: Regex,
    leading_wildcard: Regex,
    limit_clause: Regex,
}

fn heuristics() -> &'static Heuristics {
    static HEURISTICS: OnceLock<Heuristics> = OnceLock::new();
    HEURISTICS.get_or_init(|| Heuristics {
        where_clause: Regex::new(r"\bwhere\b|\.eq\(").expect("valid regex"),
        where_eq_column: Regex::new(r"where\s+([a-z_][a-z0-9_]*)\s*=").expect("valid regex"),
        sdk_eq_column: Regex::new(r#"\.eq\(\s*['"]([a-z_][a-z0-9_]*)['"]"#).expect("valid regex"),
        order_by_column: Regex::new(r"order\s+by\s+([a-z_][a-z0-9_]*)").expect("valid regex"),
        sdk_order_column: Regex::new(r#"\.order\(\s*['"]([a-z_][a-z0-9_]*)['"]"#)
            .expect("valid regex"),
        select_star: Regex::new(r"select\s+\*").expect("valid regex"),
        sdk_select_star: Regex::new(r#"\.select\(\s*['"]\*['"]"#).expect("valid regex"),
        join_clause: Regex::new(r"\bjoin\b").expect("valid regex"),
        in_subselect: Regex::new(r"\bin\s*\(\s*select\b").expect("valid regex"),
        leading_wildcard: Regex::new(r#"(?:i?like\s+'%|\.i?like\(\s*['"]%)"#)
            .expect("valid regex"),
        limit_clause: Regex::new(r"\blimit\b|\.range\(|\.single\(").expect("valid regex"),
    })
}

/// Heuristic static analysis over raw query (or backend SDK call) text.
///
/// This is a lint, not a parser: matching is best-effort regex over the
/// lower-cased query string, and absence of a match is never an error.
/// Identical input always yields an identical result.
pub struct QueryAnalyzer;

impl QueryAnalyzer {
    pub fn analyze(
        query: &str,
        table: &str,
        operation: QueryOperation,
        duration_ms: u64,
    ) -> QueryAnalysisResult {
        let text = query.to_lowercase();
        let h = heuristics();

        let mut issues = Vec::new();
        let mut recommendations = Vec::new();
        let mut suggested_indexes = Vec::new();

        // Equality filter without a known index
        if h.where_clause.is_match(&text) {
            issues.push(format!(
                "Filtered {operation} on '{table}' may be scanning without an index"
            ));
            let column = h
                .where_eq_column
                .captures(&text)
                .or_else(|| h.sdk_eq_column.captures(&text))
                .map(|c| c[1].to_string());
            if let Some(column) = column {
                recommendations.push(format!(
                    "Add a single-column index covering the '{column}' filter"
                ));
                suggested_indexes.push(format!(
                    "CREATE INDEX idx_{table}_{column} ON {table}({column})"
                ));
            }
        }

        // Sorted result sets want a matching ordered index
        if let Some(column) = h
            .order_by_column
            .captures(&text)
            .or_else(|| h.sdk_order_column.captures(&text))
            .map(|c| c[1].to_string())
        {
            recommendations.push(format!(
                "Add a descending index on '{column}' to serve the sort"
            ));
            suggested_indexes.push(format!(
                "CREATE INDEX idx_{table}_{column}_desc ON {table}({column} DESC)"
            ));
        }

        // Unbounded result sets
        if !h.limit_clause.is_match(&text) {
            issues.push("Query has no limiting clause and may return an unbounded result set".to_string());
            recommendations.push("Add a LIMIT (or range) clause to bound the result set".to_string());
        }

        // Over-fetching all columns
        if h.select_star.is_match(&text) || h.sdk_select_star.is_match(&text) {
            issues.push("Query selects all columns and may over-fetch".to_string());
            recommendations.push("Select only the columns the caller consumes".to_string());
        }

        // Join fan-out
        let join_count = h.join_clause.find_iter(&text).count();
        if join_count > 2 {
            issues.push(format!("Query performs {join_count} joins"));
            recommendations.push(
                "Consider denormalizing or splitting the query to reduce join complexity"
                    .to_string(),
            );
        }

        // Correlated sub-select inside IN (...)
        if h.in_subselect.is_match(&text) {
            issues.push("IN (SELECT ...) subquery detected".to_string());
            recommendations
                .push("Rewrite the subquery as a CTE or JOIN for better planning".to_string());
        }

        // Leading-wildcard pattern match defeats btree indexes
        if h.leading_wildcard.is_match(&text) {
            issues.push("LIKE pattern with a leading wildcard cannot use a btree index".to_string());
            recommendations.push(
                "Use a full-text or trigram index for leading-wildcard searches".to_string(),
            );
        }

        QueryAnalysisResult {
            issues,
            recommendations,
            estimated_improvement: estimate_improvement(duration_ms),
            suggested_indexes,
        }
    }
}

fn estimate_improvement(duration_ms: u64) -> ImprovementEstimate {
    if duration_ms >= 5000 {
        ImprovementEstimate::High
    } else if duration_ms >= 3000 {
        ImprovementEstimate::Significant
    } else if duration_ms >= 1500 {
        ImprovementEstimate::Moderate
    } else {
        ImprovementEstimate::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_star_flags_over_fetch() {
        let result = QueryAnalyzer::analyze("select * from x", "x", QueryOperation::Select, 1200);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("all columns")), "issues: {:?}", result.issues);
    }

    #[test]
    fn test_equality_filter_suggests_index() {
        let result = QueryAnalyzer::analyze(
            "select id from x where y = 1",
            "x",
            QueryOperation::Select,
            1200,
        );
        assert!(result.issues.iter().any(|i| i.contains("index")));
        assert!(result
            .suggested_indexes
            .contains(&"CREATE INDEX idx_x_y ON x(y)".to_string()));
    }

    #[test]
    fn test_sdk_eq_form_suggests_index() {
        let result = QueryAnalyzer::analyze(
            "supabase.from('contacts').select('id').eq('tenant_id', tid)",
            "contacts",
            QueryOperation::Select,
            1100,
        );
        assert!(result
            .suggested_indexes
            .contains(&"CREATE INDEX idx_contacts_tenant_id ON contacts(tenant_id)".to_string()));
    }

    #[test]
    fn test_order_by_suggests_descending_index() {
        let result = QueryAnalyzer::analyze(
            "select id from deals order by created_at limit 20",
            "deals",
            QueryOperation::Select,
            1100,
        );
        assert!(result
            .suggested_indexes
            .contains(&"CREATE INDEX idx_deals_created_at_desc ON deals(created_at DESC)".to_string()));
    }

    #[test]
    fn test_missing_limit_flags_unbounded() {
        let result = QueryAnalyzer::analyze(
            "select id from contacts",
            "contacts",
            QueryOperation::Select,
            1100,
        );
        assert!(result.issues.iter().any(|i| i.contains("unbounded")));

        let bounded = QueryAnalyzer::analyze(
            "select id from contacts limit 10",
            "contacts",
            QueryOperation::Select,
            1100,
        );
        assert!(!bounded.issues.iter().any(|i| i.contains("unbounded")));
    }

    #[test]
    fn test_join_complexity_threshold() {
        let two_joins = "select a.id from a join b on a.id = b.a_id join c on b.id = c.b_id limit 1";
        let result = QueryAnalyzer::analyze(two_joins, "a", QueryOperation::Select, 1100);
        assert!(!result.issues.iter().any(|i| i.contains("joins")));

        let three_joins =
            "select a.id from a join b on a.id = b.a_id join c on b.id = c.b_id join d on c.id = d.c_id limit 1";
        let result = QueryAnalyzer::analyze(three_joins, "a", QueryOperation::Select, 1100);
        assert!(result.issues.iter().any(|i| i.contains("3 joins")));
    }

    #[test]
    fn test_in_subselect_recommends_rewrite() {
        let result = QueryAnalyzer::analyze(
            "select id from deals where contact_id in (select id from contacts where tier = 'a') limit 5",
            "deals",
            QueryOperation::Select,
            1100,
        );
        assert!(result.issues.iter().any(|i| i.contains("subquery")));
        assert!(result.recommendations.iter().any(|r| r.contains("CTE")));
    }

    #[test]
    fn test_leading_wildcard_flags_pattern() {
        let result = QueryAnalyzer::analyze(
            "select id from contacts where email like '%@example.com' limit 5",
            "contacts",
            QueryOperation::Select,
            1100,
        );
        assert!(result.issues.iter().any(|i| i.contains("wildcard")));

        let trailing = QueryAnalyzer::analyze(
            "select id from contacts where email like 'a%' limit 5",
            "contacts",
            QueryOperation::Select,
            1100,
        );
        assert!(!trailing.issues.iter().any(|i| i.contains("wildcard")));
    }

    #[test]
    fn test_analysis_is_pure() {
        let query = "select * from positions where account_id = 7 order by traded_at";
        let a = QueryAnalyzer::analyze(query, "positions", QueryOperation::Select, 2200);
        let b = QueryAnalyzer::analyze(query, "positions", QueryOperation::Select, 2200);
        assert_eq!(a, b);
    }

    #[test]
    fn test_malformed_text_never_panics() {
        let result = QueryAnalyzer::analyze(
            "where ((( order by .eq( '%' select",
            "junk",
            QueryOperation::Rpc,
            1001,
        );
        // Advisory only: garbage in, some result out
        assert!(result.recommendations.len() + result.issues.len() > 0);
    }

    #[test]
    fn test_improvement_estimate_buckets() {
        assert_eq!(estimate_improvement(1000), ImprovementEstimate::Low);
        assert_eq!(estimate_improvement(1500), ImprovementEstimate::Moderate);
        assert_eq!(estimate_improvement(3000), ImprovementEstimate::Significant);
        assert_eq!(estimate_improvement(6000), ImprovementEstimate::High);
    }
}
