//! Experiment orchestration
//!
//! Runs every variant of an experiment under one of three policies and
//! aggregates the results into an [`ExperimentSummary`]:
//!
//! - sequential: one variant at a time, optionally stopping at the first
//!   failure
//! - parallel: every variant at once
//! - bounded: chunks of `max_concurrency` variants, each chunk joined before
//!   the next starts, optionally stopping after a chunk with a failure
//!
//! All futures are driven on the calling task. "Parallel" means launched
//! together and joined, so the procedure decides how much real parallelism
//! there is.

use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::domain::experiment::{
    ExperimentConfig, ExperimentSummary, RunOptions, Variant, VariantResult,
};
use crate::domain::tracking::TrackingEvent;
use crate::domain::DomainError;
use crate::infrastructure::tracking::{SinkFactory, Tracker};

use super::runner::VariantRunner;

/// Drives full experiments
#[derive(Debug, Clone, Default)]
pub struct ExperimentOrchestrator {
    runner: VariantRunner,
    tracker: Tracker,
}

impl ExperimentOrchestrator {
    /// Create an orchestrator emitting events through `tracker`
    pub fn new(tracker: Tracker) -> Self {
        Self {
            runner: VariantRunner::new(tracker.clone()),
            tracker,
        }
    }

    /// Create an orchestrator with the sink selected by configuration.
    /// Must be called inside a Tokio runtime unless tracking is disabled.
    pub fn from_config(config: &EngineConfig) -> Result<Self, DomainError> {
        let tracker = SinkFactory::new().create_tracker(&config.tracking)?;
        Ok(Self::new(tracker))
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn runner(&self) -> &VariantRunner {
        &self.runner
    }

    /// Run an experiment.
    ///
    /// Only a malformed config is an error; variant failures are reported in
    /// the summary. Results keep the input order of the variants that ran.
    pub async fn run<C, R>(
        &self,
        config: &ExperimentConfig<C, R>,
        options: RunOptions<C, R>,
    ) -> Result<ExperimentSummary<R>, DomainError>
    where
        C: Clone,
    {
        config.validate()?;

        let started_at = Utc::now();
        let clock = Instant::now();

        info!(
            experiment_id = %config.id(),
            variants = config.variants().len(),
            parallel = options.parallel,
            max_concurrency = ?options.concurrency_limit(),
            stop_on_error = options.stop_on_error,
            "Starting experiment '{}'",
            config.name()
        );
        self.tracker.track(TrackingEvent::experiment_start(
            config.id(),
            config.name(),
            config.variants().len(),
        ));

        let results = match (options.parallel, options.concurrency_limit()) {
            (false, _) => self.run_sequential(config, &options).await,
            (true, None) => self.run_batch(config, config.variants(), &options).await,
            (true, Some(limit)) => self.run_chunked(config, limit, &options).await,
        };

        let summary = ExperimentSummary::from_results(config.id().clone(), results, started_at, clock);

        info!(
            experiment_id = %summary.experiment_id,
            success_count = summary.success_count,
            failure_count = summary.failure_count,
            best_variant_id = ?summary.best_variant_id().map(|id| id.as_str()),
            total_duration_ms = summary.total_duration.as_millis() as u64,
            "Experiment completed"
        );
        self.tracker.track(TrackingEvent::experiment_complete(&summary));

        Ok(summary)
    }

    async fn run_sequential<C, R>(
        &self,
        config: &ExperimentConfig<C, R>,
        options: &RunOptions<C, R>,
    ) -> Vec<VariantResult<R>>
    where
        C: Clone,
    {
        let mut results = Vec::with_capacity(config.variants().len());

        for variant in config.variants() {
            let result = self.run_variant(config, variant, options).await;
            let failed = !result.success;
            results.push(result);

            if failed && options.stop_on_error {
                debug!(
                    experiment_id = %config.id(),
                    variant_id = %variant.id(),
                    remaining = config.variants().len() - results.len(),
                    "Stopping after failed variant"
                );
                break;
            }
        }

        results
    }

    async fn run_chunked<C, R>(
        &self,
        config: &ExperimentConfig<C, R>,
        limit: usize,
        options: &RunOptions<C, R>,
    ) -> Vec<VariantResult<R>>
    where
        C: Clone,
    {
        let mut results = Vec::with_capacity(config.variants().len());

        for (index, chunk) in config.variants().chunks(limit).enumerate() {
            let batch = self.run_batch(config, chunk, options).await;
            let failed = batch.iter().any(|r| !r.success);
            results.extend(batch);

            if failed && options.stop_on_error {
                debug!(
                    experiment_id = %config.id(),
                    chunk = index,
                    remaining = config.variants().len() - results.len(),
                    "Stopping after chunk with failed variant"
                );
                break;
            }
        }

        results
    }

    /// Start every variant in `variants` and wait for all of them
    async fn run_batch<C, R>(
        &self,
        config: &ExperimentConfig<C, R>,
        variants: &[Variant<C>],
        options: &RunOptions<C, R>,
    ) -> Vec<VariantResult<R>>
    where
        C: Clone,
    {
        join_all(
            variants
                .iter()
                .map(|variant| self.run_variant(config, variant, options)),
        )
        .await
    }

    async fn run_variant<C, R>(
        &self,
        config: &ExperimentConfig<C, R>,
        variant: &Variant<C>,
        options: &RunOptions<C, R>,
    ) -> VariantResult<R>
    where
        C: Clone,
    {
        options.notify_start(variant);
        let result = self
            .runner
            .run(config, variant, options.context_data.clone())
            .await;
        options.notify_finished(variant, &result);
        result
    }
}
