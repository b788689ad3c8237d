//! Aggregation of grouped records into a chronological monthly series
//!
//! Raw grouped rows arrive with inconsistent period labels and possible
//! duplicates for the same month. After normalization, buckets sharing a
//! canonical key are summed; rows whose label cannot be normalized are
//! collected with their original record instead of being forced into a
//! wrong bucket.

use crate::core::types::{MonthBucket, UnmappedEntry};
use crate::series::normalize::{is_canonical, normalize_value};
use serde_json::Value;
use std::collections::BTreeMap;

/// Number of most recent buckets kept for display
pub const SERIES_DISPLAY_MONTHS: usize = 12;

/// Result of aggregating raw grouped rows
#[derive(Debug, Default)]
pub struct SeriesOutcome {
    /// Chronologically ordered canonical buckets
    pub buckets: Vec<MonthBucket>,
    /// Rows that could not be placed, kept for inspection
    pub unmapped: Vec<UnmappedEntry>,
}

impl SeriesOutcome {
    /// The most recent `SERIES_DISPLAY_MONTHS` buckets, still chronological
    pub fn display_series(&self) -> &[MonthBucket] {
        let start = self.buckets.len().saturating_sub(SERIES_DISPLAY_MONTHS);
        &self.buckets[start..]
    }
}

/// Aggregate grouped rows into monthly buckets
///
/// `label_key` names the grouping field in each row (e.g.
/// `date_order:month`), `value_key` the numeric field to sum. Duplicate
/// periods are summed, never overwritten; the output is sorted by
/// canonical key, which for `YYYY-MM` is chronological order.
pub fn aggregate_series(rows: &[Value], label_key: &str, value_key: &str) -> SeriesOutcome {
    // BTreeMap keeps canonical keys sorted as they accumulate
    let mut buckets: BTreeMap<String, f64> = BTreeMap::new();
    let mut unmapped = Vec::new();

    for row in rows {
        let label = row.get(label_key).cloned().unwrap_or(Value::Null);
        let amount = row
            .get(value_key)
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let normalized = normalize_value(&label);
        if is_canonical(&normalized) {
            *buckets.entry(normalized).or_insert(0.0) += amount;
        } else {
            tracing::debug!(?label, "period label left unmapped");
            unmapped.push(UnmappedEntry {
                raw: label,
                normalized: String::new(),
                amount,
                original: row.clone(),
            });
        }
    }

    SeriesOutcome {
        buckets: buckets
            .into_iter()
            .map(|(period, value)| MonthBucket { period, value })
            .collect(),
        unmapped,
    }
}
