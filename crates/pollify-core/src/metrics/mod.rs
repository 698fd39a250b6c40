//! Behavioral metrics over a form's completed responses.
//!
//! Batch computation of per-question statistics: time spent, answer-change
//! rate, and completion rate. Pure over its inputs -- the aggregator never
//! mutates, so it can run against a snapshot that misses the most recent
//! in-flight submission.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{Question, Response};

/// {min, max, avg} of time spent on one question, in seconds.
///
/// Population: responses that contain an item for the question. All zero
/// when that population is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeDistribution {
    pub min_secs: u64,
    pub max_secs: u64,
    pub avg_secs: f64,
}

/// Aggregated behavioral statistics for one question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionMetrics {
    pub question_id: String,
    pub title: String,
    /// Responses containing an item for this question.
    pub answer_count: usize,
    /// Mean seconds spent, over responses containing the question.
    pub avg_time_secs: f64,
    /// Mean answer overwrites before moving on, same population.
    pub change_rate: f64,
    pub time: TimeDistribution,
    /// Share of ALL responses with a substantive answer, 0-100.
    pub completion_rate_pct: f64,
}

/// Aggregator for behavioral metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator;

impl MetricsAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Compute per-question metrics over a full response set.
    ///
    /// A zero-response form yields an all-zero entry per question rather
    /// than NaN or a division error.
    pub fn aggregate(
        &self,
        questions: &[Question],
        responses: &[Response],
    ) -> HashMap<String, QuestionMetrics> {
        let total_responses = responses.len();
        let mut metrics = HashMap::new();

        for question in questions {
            let items: Vec<_> = responses
                .iter()
                .filter_map(|r| r.item(&question.id))
                .collect();

            let answer_count = items.len();
            let times: Vec<u64> = items.iter().map(|i| i.time_spent_secs).collect();
            let total_time: u64 = times.iter().sum();
            let total_changes: u64 = items.iter().map(|i| u64::from(i.change_count)).sum();

            let avg_time_secs = if answer_count > 0 {
                total_time as f64 / answer_count as f64
            } else {
                0.0
            };
            let change_rate = if answer_count > 0 {
                total_changes as f64 / answer_count as f64
            } else {
                0.0
            };

            let completed = items.iter().filter(|i| i.value.is_substantive()).count();
            let completion_rate_pct = if total_responses > 0 {
                completed as f64 / total_responses as f64 * 100.0
            } else {
                0.0
            };

            metrics.insert(
                question.id.clone(),
                QuestionMetrics {
                    question_id: question.id.clone(),
                    title: question.title.clone(),
                    answer_count,
                    avg_time_secs,
                    change_rate,
                    time: TimeDistribution {
                        min_secs: times.iter().copied().min().unwrap_or(0),
                        max_secs: times.iter().copied().max().unwrap_or(0),
                        avg_secs: avg_time_secs,
                    },
                    completion_rate_pct,
                },
            );
        }

        metrics
    }
}
