//! Infrastructure layer for running experiments
//!
//! [`VariantRunner`] executes a single variant; [`ExperimentOrchestrator`]
//! schedules every variant of an experiment and builds the summary.

mod orchestrator;
mod runner;

pub use orchestrator::ExperimentOrchestrator;
pub use runner::VariantRunner;
