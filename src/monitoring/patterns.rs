use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::QueryOperation;

const MAX_EXAMPLES_PER_PATTERN: usize = 3;

/// Running statistics for one `table.operation` pattern.
///
/// Invariant: `avg_duration_ms == total_duration_ms / count` after every
/// update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPatternStats {
    pub pattern: String,
    pub count: u64,
    pub total_duration_ms: u64,
    pub avg_duration_ms: f64,
    pub max_duration_ms: u64,
    pub examples: Vec<String>,
}

/// Monotonic accumulator of per-pattern query statistics.
///
/// Patterns are never removed individually; the only removal path is a
/// full [`PatternAggregator::clear`].
#[derive(Debug, Default)]
pub struct PatternAggregator {
    patterns: HashMap<String, QueryPatternStats>,
}

impl PatternAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, table: &str, operation: QueryOperation, duration_ms: u64, query: &str) {
        let key = format!("{table}.{operation}");
        let stats = self
            .patterns
            .entry(key.clone())
            .or_insert_with(|| QueryPatternStats {
                pattern: key,
                count: 0,
                total_duration_ms: 0,
                avg_duration_ms: 0.0,
                max_duration_ms: 0,
                examples: Vec::new(),
            });

        stats.count += 1;
        stats.total_duration_ms += duration_ms;
        stats.avg_duration_ms = stats.total_duration_ms as f64 / stats.count as f64;
        stats.max_duration_ms = stats.max_duration_ms.max(duration_ms);
        if stats.examples.len() < MAX_EXAMPLES_PER_PATTERN {
            stats.examples.push(query.to_string());
        }
    }

    /// All patterns sorted descending by average duration. The sort is
    /// stable; ties keep the iteration order of the underlying map.
    pub fn snapshot(&self) -> Vec<QueryPatternStats> {
        let mut stats: Vec<_> = self.patterns.values().cloned().collect();
        stats.sort_by(|a, b| b.avg_duration_ms.total_cmp(&a.avg_duration_ms));
        stats
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
    }
}
