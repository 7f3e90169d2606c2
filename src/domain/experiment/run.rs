//! Single variant run lifecycle
//!
//! A run moves `Pending -> Running -> {Completed | Failed}`. Each stage is a
//! distinct type that is consumed by the next transition, so a result can
//! only be finalised once.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::entity::{ExperimentId, Variant, VariantId};
use super::result::{VariantError, VariantResult};

/// Status of a single variant run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Completed and failed runs never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Context handed to the procedure under test
#[derive(Debug, Clone)]
pub struct RunContext {
    pub experiment_id: ExperimentId,
    pub variant_id: VariantId,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Shared, read-only data supplied by the caller for every run
    pub data: Arc<Value>,
}

/// A run that has been created but not started
#[derive(Debug)]
pub struct PendingRun {
    experiment_id: ExperimentId,
    variant_id: VariantId,
    variant_name: String,
    run_id: Uuid,
}

impl PendingRun {
    /// Create a run with a fresh run id
    pub fn new<C>(experiment_id: &ExperimentId, variant: &Variant<C>) -> Self {
        Self {
            experiment_id: experiment_id.clone(),
            variant_id: variant.id().clone(),
            variant_name: variant.name().to_string(),
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn status(&self) -> RunStatus {
        RunStatus::Pending
    }

    /// Start the clock and build the context for the procedure
    pub fn start(self, data: Arc<Value>) -> (RunningRun, RunContext) {
        let started_at = Utc::now();

        let context = RunContext {
            experiment_id: self.experiment_id.clone(),
            variant_id: self.variant_id.clone(),
            run_id: self.run_id,
            started_at,
            data,
        };

        let running = RunningRun {
            experiment_id: self.experiment_id,
            variant_id: self.variant_id,
            variant_name: self.variant_name,
            run_id: self.run_id,
            started_at,
            clock: Instant::now(),
        };

        (running, context)
    }
}

/// A run whose procedure has been invoked.
///
/// Not `Clone`: finalising consumes the run, so it cannot be both completed
/// and failed.
///
/// ```compile_fail
/// use std::sync::Arc;
/// use experiment_engine::domain::experiment::{
///     ExperimentId, PendingRun, Variant, VariantError, VariantId,
/// };
///
/// let variant = Variant::new(VariantId::new("v1").unwrap(), "first", 1);
/// let pending = PendingRun::new(&ExperimentId::new("exp").unwrap(), &variant);
/// let (running, _context) = pending.start(Arc::new(serde_json::Value::Null));
///
/// let copy = running.clone();
/// let _ = running.complete(1, None);
/// let _ = copy.fail::<i32>(VariantError::new("again"));
/// ```
#[derive(Debug)]
pub struct RunningRun {
    experiment_id: ExperimentId,
    variant_id: VariantId,
    variant_name: String,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl RunningRun {
    pub fn experiment_id(&self) -> &ExperimentId {
        &self.experiment_id
    }

    pub fn variant_id(&self) -> &VariantId {
        &self.variant_id
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn status(&self) -> RunStatus {
        RunStatus::Running
    }

    /// Wall-clock time since the run started
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Finalise as a success
    pub fn complete<R>(self, result: R, metric_value: Option<f64>) -> VariantResult<R> {
        let duration = self.clock.elapsed();
        VariantResult {
            experiment_id: self.experiment_id,
            variant_id: self.variant_id,
            variant_name: self.variant_name,
            run_id: self.run_id,
            result: Some(result),
            metric_value,
            duration,
            started_at: self.started_at,
            completed_at: Utc::now(),
            success: true,
            error: None,
        }
    }

    /// Finalise as a failure; the procedure result, if any, is dropped
    pub fn fail<R>(self, error: VariantError) -> VariantResult<R> {
        let duration = self.clock.elapsed();
        VariantResult {
            experiment_id: self.experiment_id,
            variant_id: self.variant_id,
            variant_name: self.variant_name,
            run_id: self.run_id,
            result: None,
            metric_value: None,
            duration,
            started_at: self.started_at,
            completed_at: Utc::now(),
            success: false,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending() -> PendingRun {
        let variant = Variant::new(VariantId::new("v1").unwrap(), "first", 1);
        PendingRun::new(&ExperimentId::new("exp-1").unwrap(), &variant)
    }

    #[test]
    fn test_run_ids_are_fresh() {
        assert_ne!(pending().run_id(), pending().run_id());
    }

    #[test]
    fn test_start_builds_context() {
        let run = pending();
        let run_id = run.run_id();
        let (running, context) = run.start(Arc::new(json!({"seed": 7})));

        assert_eq!(running.status(), RunStatus::Running);
        assert_eq!(context.run_id, run_id);
        assert_eq!(context.experiment_id.as_str(), "exp-1");
        assert_eq!(context.variant_id.as_str(), "v1");
        assert_eq!(context.data["seed"], 7);
    }

    #[test]
    fn test_complete() {
        let (running, _) = pending().start(Arc::new(Value::Null));
        let result = running.complete(42, Some(4.2));

        assert!(result.success);
        assert_eq!(result.status(), RunStatus::Completed);
        assert_eq!(result.result, Some(42));
        assert_eq!(result.metric_value, Some(4.2));
        assert!(result.completed_at >= result.started_at);
        assert_eq!(result.variant_name, "first");
    }

    #[test]
    fn test_fail() {
        let (running, _) = pending().start(Arc::new(Value::Null));
        let result: VariantResult<i32> = running.fail(VariantError::new("boom"));

        assert!(!result.success);
        assert_eq!(result.status(), RunStatus::Failed);
        assert!(result.result.is_none());
        assert!(result.metric_value.is_none());
        assert_eq!(result.error.as_ref().unwrap().message, "boom");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert_eq!(RunStatus::Failed.to_string(), "failed");
    }
}
