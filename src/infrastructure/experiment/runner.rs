//! Single variant execution

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::experiment::{
    ExperimentConfig, PendingRun, RunningRun, Variant, VariantError, VariantResult,
};
use crate::domain::tracking::TrackingEvent;
use crate::infrastructure::tracking::Tracker;

/// Runs one variant: invokes the procedure, times it, computes the metric
/// and turns any error or panic into a failed [`VariantResult`].
#[derive(Debug, Clone, Default)]
pub struct VariantRunner {
    tracker: Tracker,
}

impl VariantRunner {
    pub fn new(tracker: Tracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Run `variant` with a fresh run id. Never fails: procedure and metric
    /// errors are returned as data.
    pub async fn run<C, R>(
        &self,
        config: &ExperimentConfig<C, R>,
        variant: &Variant<C>,
        data: Arc<Value>,
    ) -> VariantResult<R>
    where
        C: Clone,
    {
        let pending = PendingRun::new(config.id(), variant);
        self.tracker.track(TrackingEvent::variant_start(
            config.id(),
            variant,
            pending.run_id(),
        ));

        let (running, context) = pending.start(data);
        debug!(
            experiment_id = %config.id(),
            variant_id = %variant.id(),
            run_id = %running.run_id(),
            "Running variant"
        );

        let execute = config.execute_fn();
        let variant_config = variant.config().clone();
        let execution = AssertUnwindSafe(async move { execute(variant_config, context).await })
            .catch_unwind()
            .await;

        let outcome = match execution {
            Ok(Ok(value)) => self.measure(config, variant, &running, value).await,
            Ok(Err(e)) => Err(VariantError::from_anyhow(&e)),
            Err(panic) => Err(VariantError::new(panic_message(panic.as_ref()))
                .with_details("procedure panicked")),
        };

        match outcome {
            Ok((value, metric_value)) => {
                let result = running.complete(value, metric_value);
                debug!(
                    experiment_id = %result.experiment_id,
                    variant_id = %result.variant_id,
                    duration_ms = result.duration.as_millis() as u64,
                    metric_value = ?result.metric_value,
                    "Variant completed"
                );
                self.tracker.track(TrackingEvent::variant_complete(&result));
                result
            }
            Err(error) => {
                let result = running.fail(error.clone());
                warn!(
                    experiment_id = %result.experiment_id,
                    variant_id = %result.variant_id,
                    duration_ms = result.duration.as_millis() as u64,
                    error = %error,
                    "Variant failed"
                );
                self.tracker.track(TrackingEvent::variant_error(&result, &error));
                result
            }
        }
    }

    /// Compute the metric for a successful execution. A metric error or
    /// panic fails the whole variant.
    async fn measure<C, R>(
        &self,
        config: &ExperimentConfig<C, R>,
        variant: &Variant<C>,
        running: &RunningRun,
        value: R,
    ) -> Result<(R, Option<f64>), VariantError> {
        let Some(metric) = config.metric_fn() else {
            return Ok((value, None));
        };

        let computed = AssertUnwindSafe(async { metric(&value).await })
            .catch_unwind()
            .await;

        match computed {
            Ok(Ok(metric_value)) => {
                self.tracker.track(TrackingEvent::metric_computed(
                    config.id(),
                    variant,
                    running.run_id(),
                    metric_value,
                ));
                Ok((value, Some(metric_value)))
            }
            Ok(Err(e)) => Err(VariantError::new(format!("Metric computation failed: {}", e))
                .with_details(format!("{:?}", e))),
            Err(panic) => Err(VariantError::new(format!(
                "Metric computation failed: {}",
                panic_message(panic.as_ref())
            ))
            .with_details("metric panicked")),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
