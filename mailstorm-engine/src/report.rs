//! Aggregation of raw send results into a run report.
//!
//! Reports are derived on demand and never persisted here; the management
//! layer renders and stores them.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::EngineError,
    sender::{Outcome, SendResult},
};

/// Aggregated statistics for one run.
///
/// The three breakdowns cover attempts with [`Outcome::Failed`] and are
/// sorted by descending count (ties by label, for stable output). They are
/// present but empty when nothing failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub scenario_name: String,
    pub report_time: DateTime<Utc>,
    pub test_start_time: DateTime<Utc>,
    pub test_end_time: DateTime<Utc>,

    pub total_sends: usize,
    pub successful_sends: usize,
    pub failed_sends: usize,
    /// Percentage of successful attempts, in `[0, 100]`.
    pub success_rate: f64,

    pub total_recipients: usize,
    pub avg_recipients_per_send: f64,

    /// Per-attempt duration statistics, in seconds.
    pub avg_duration: f64,
    pub min_duration: f64,
    pub max_duration: f64,
    /// Attempts per second of cumulative attempt time, not wall-clock
    /// test time.
    pub sends_per_second: f64,

    pub error_categories: Vec<(String, u64)>,
    pub smtp_codes: Vec<(String, u64)>,
    pub error_breakdown: Vec<(String, u64)>,
}

/// Computes a [`RunReport`] from a result set.
///
/// # Errors
///
/// Fails with [`EngineError::EmptyResults`] on an empty input; duration and
/// mean statistics are undefined for zero attempts.
#[allow(
    clippy::cast_precision_loss,
    reason = "attempt counts are far below 2^52"
)]
pub fn summarize(scenario_name: &str, results: &[SendResult]) -> Result<RunReport, EngineError> {
    let first = results.first().ok_or(EngineError::EmptyResults)?;

    let total = results.len();
    let successful = results
        .iter()
        .filter(|r| r.outcome == Outcome::Success)
        .count();
    let failed = total - successful;

    let mut test_start_time = first.started_at;
    let mut test_end_time = first.finished_at;
    let mut min_duration = f64::MAX;
    let mut max_duration = f64::MIN;
    let mut total_duration = 0.0;
    let mut total_recipients = 0;

    for result in results {
        test_start_time = test_start_time.min(result.started_at);
        test_end_time = test_end_time.max(result.finished_at);
        min_duration = min_duration.min(result.duration_secs);
        max_duration = max_duration.max(result.duration_secs);
        total_duration += result.duration_secs;
        total_recipients += result.recipient_count;
    }

    let sends_per_second = if total_duration > 0.0 {
        total as f64 / total_duration
    } else {
        0.0
    };

    let failures = || results.iter().filter(|r| r.outcome == Outcome::Failed);

    Ok(RunReport {
        scenario_name: scenario_name.to_string(),
        report_time: Utc::now(),
        test_start_time,
        test_end_time,
        total_sends: total,
        successful_sends: successful,
        failed_sends: failed,
        success_rate: successful as f64 / total as f64 * 100.0,
        total_recipients,
        avg_recipients_per_send: total_recipients as f64 / total as f64,
        avg_duration: total_duration / total as f64,
        min_duration,
        max_duration,
        sends_per_second,
        error_categories: breakdown(
            failures().filter_map(|r| r.category.map(|category| category.to_string())),
        ),
        smtp_codes: breakdown(failures().filter_map(|r| r.smtp_code.clone())),
        error_breakdown: breakdown(failures().filter_map(|r| r.error.clone())),
    })
}

/// Counts occurrences and sorts by descending count, ties by label.
fn breakdown(items: impl Iterator<Item = String>) -> Vec<(String, u64)> {
    let mut counts: AHashMap<String, u64> = AHashMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }

    let mut sorted: Vec<(String, u64)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}
