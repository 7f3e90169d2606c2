//! Tracking events emitted by the engine

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::experiment::{
    ExperimentId, ExperimentSummary, Variant, VariantError, VariantResult,
};

/// Kind of tracking event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "experiment.start")]
    ExperimentStart,
    #[serde(rename = "experiment.complete")]
    ExperimentComplete,
    #[serde(rename = "variant.start")]
    VariantStart,
    #[serde(rename = "variant.complete")]
    VariantComplete,
    #[serde(rename = "variant.error")]
    VariantError,
    #[serde(rename = "metric.computed")]
    MetricComputed,
    #[serde(rename = "decision.made")]
    DecisionMade,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExperimentStart => "experiment.start",
            Self::ExperimentComplete => "experiment.complete",
            Self::VariantStart => "variant.start",
            Self::VariantComplete => "variant.complete",
            Self::VariantError => "variant.error",
            Self::MetricComputed => "metric.computed",
            Self::DecisionMade => "decision.made",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fire-and-forget telemetry event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

impl TrackingEvent {
    pub fn new(event_type: EventType, data: Value) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            data,
        }
    }

    /// Experiment id carried in the payload, if any
    pub fn experiment_id(&self) -> Option<&str> {
        self.data.get("experiment_id").and_then(Value::as_str)
    }

    /// Variant id carried in the payload, if any
    pub fn variant_id(&self) -> Option<&str> {
        self.data.get("variant_id").and_then(Value::as_str)
    }

    pub fn experiment_start(experiment_id: &ExperimentId, name: &str, variant_count: usize) -> Self {
        Self::new(
            EventType::ExperimentStart,
            json!({
                "experiment_id": experiment_id.as_str(),
                "name": name,
                "variant_count": variant_count,
            }),
        )
    }

    pub fn experiment_complete<R>(summary: &ExperimentSummary<R>) -> Self {
        Self::new(
            EventType::ExperimentComplete,
            json!({
                "experiment_id": summary.experiment_id.as_str(),
                "success_count": summary.success_count,
                "failure_count": summary.failure_count,
                "total_duration_ms": summary.total_duration.as_millis() as u64,
                "best_variant_id": summary.best_variant_id().map(|id| id.as_str()),
            }),
        )
    }

    pub fn variant_start<C>(
        experiment_id: &ExperimentId,
        variant: &Variant<C>,
        run_id: uuid::Uuid,
    ) -> Self {
        Self::new(
            EventType::VariantStart,
            json!({
                "experiment_id": experiment_id.as_str(),
                "variant_id": variant.id().as_str(),
                "variant_name": variant.name(),
                "run_id": run_id.to_string(),
            }),
        )
    }

    pub fn metric_computed<C>(
        experiment_id: &ExperimentId,
        variant: &Variant<C>,
        run_id: uuid::Uuid,
        value: f64,
    ) -> Self {
        Self::new(
            EventType::MetricComputed,
            json!({
                "experiment_id": experiment_id.as_str(),
                "variant_id": variant.id().as_str(),
                "run_id": run_id.to_string(),
                "value": value,
            }),
        )
    }

    pub fn variant_complete<R>(result: &VariantResult<R>) -> Self {
        Self::new(
            EventType::VariantComplete,
            json!({
                "experiment_id": result.experiment_id.as_str(),
                "variant_id": result.variant_id.as_str(),
                "run_id": result.run_id.to_string(),
                "success": result.success,
                "metric_value": result.metric_value,
                "duration_ms": result.duration.as_millis() as u64,
            }),
        )
    }

    pub fn variant_error<R>(result: &VariantResult<R>, error: &VariantError) -> Self {
        Self::new(
            EventType::VariantError,
            json!({
                "experiment_id": result.experiment_id.as_str(),
                "variant_id": result.variant_id.as_str(),
                "run_id": result.run_id.to_string(),
                "error": error.message,
                "details": error.details,
                "duration_ms": result.duration.as_millis() as u64,
            }),
        )
    }

    pub fn decision_made(strategy: &str, data: Value) -> Self {
        let mut payload = json!({ "strategy": strategy });
        if let (Value::Object(target), Value::Object(extra)) = (&mut payload, data) {
            target.extend(extra);
        }
        Self::new(EventType::DecisionMade, payload)
    }
}
