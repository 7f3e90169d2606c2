//! Experiment result types

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{ExperimentId, VariantId};
use super::run::RunStatus;
use super::statistics::MetricStats;

// ============================================================================
// VariantError
// ============================================================================

/// Failure captured from a variant run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantError {
    /// Top-level error message
    pub message: String,
    /// Full error chain, or panic payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl VariantError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Build from an `anyhow` error, keeping the whole cause chain
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self::new(err.to_string()).with_details(format!("{:?}", err))
    }
}

impl std::fmt::Display for VariantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

// ============================================================================
// VariantResult
// ============================================================================

/// Outcome of one variant run. Built once by the run lifecycle and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantResult<R> {
    pub experiment_id: ExperimentId,
    pub variant_id: VariantId,
    pub variant_name: String,
    pub run_id: Uuid,
    /// Procedure output, absent on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_value: Option<f64>,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<VariantError>,
}

impl<R> VariantResult<R> {
    pub fn status(&self) -> RunStatus {
        if self.success {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        }
    }

    /// Metric value of a successful run
    pub fn ranked_metric(&self) -> Option<f64> {
        if self.success { self.metric_value } else { None }
    }
}

// ============================================================================
// ExperimentSummary
// ============================================================================

/// Aggregated outcome of an experiment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary<R> {
    pub experiment_id: ExperimentId,
    /// One entry per variant that ran, in input order
    pub results: Vec<VariantResult<R>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    best_variant_index: Option<usize>,
    #[serde(rename = "total_duration_ms", with = "duration_ms")]
    pub total_duration: Duration,
    pub success_count: usize,
    pub failure_count: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl<R> ExperimentSummary<R> {
    /// Aggregate results and select the best variant.
    ///
    /// The best variant is the successful result with the highest metric
    /// value; ties go to the earliest result in input order.
    pub fn from_results(
        experiment_id: ExperimentId,
        results: Vec<VariantResult<R>>,
        started_at: DateTime<Utc>,
        clock: Instant,
    ) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        let failure_count = results.len() - success_count;

        let mut best: Option<(usize, f64)> = None;
        for (index, result) in results.iter().enumerate() {
            if let Some(value) = result.ranked_metric() {
                if best.is_none_or(|(_, current)| value > current) {
                    best = Some((index, value));
                }
            }
        }

        Self {
            experiment_id,
            results,
            best_variant_index: best.map(|(index, _)| index),
            total_duration: clock.elapsed(),
            success_count,
            failure_count,
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// Best successful variant, if any produced a metric
    pub fn best_variant(&self) -> Option<&VariantResult<R>> {
        self.best_variant_index.and_then(|index| self.results.get(index))
    }

    pub fn best_variant_id(&self) -> Option<&VariantId> {
        self.best_variant().map(|r| &r.variant_id)
    }

    pub fn successes(&self) -> impl Iterator<Item = &VariantResult<R>> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &VariantResult<R>> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Result for a given variant
    pub fn result_for(&self, variant_id: &str) -> Option<&VariantResult<R>> {
        self.results
            .iter()
            .find(|r| r.variant_id.as_str() == variant_id)
    }

    /// `(variant, metric)` for every successful run that produced a metric
    pub fn metric_values(&self) -> Vec<(&VariantId, f64)> {
        self.results
            .iter()
            .filter_map(|r| r.ranked_metric().map(|value| (&r.variant_id, value)))
            .collect()
    }

    pub fn metric_stats(&self) -> MetricStats {
        let values: Vec<f64> = self.metric_values().into_iter().map(|(_, v)| v).collect();
        MetricStats::from_samples(&values)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
