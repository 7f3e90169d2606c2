//! Experiment domain module
//!
//! Types for defining experiments over parameterised variants, tracking the
//! lifecycle of each variant run and summarising the outcome.

mod entity;
mod options;
mod result;
mod run;
mod statistics;
mod validation;

// Re-export all public types
pub use entity::{ExecuteFn, ExperimentConfig, ExperimentId, MetricFn, Variant, VariantId};
pub use options::{RunOptions, VariantCompleteHook, VariantErrorHook, VariantStartHook};
pub use result::{ExperimentSummary, VariantError, VariantResult};
pub use run::{PendingRun, RunContext, RunStatus, RunningRun};
pub use statistics::{MetricStats, mean, std_dev, variance};
pub use validation::{
    ExperimentValidationError, IdKind, MAX_ID_LENGTH, validate_experiment_id, validate_id,
    validate_variant_id, validate_variant_ids,
};
