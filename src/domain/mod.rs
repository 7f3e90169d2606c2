//! Domain layer - Core entities, algorithms and interfaces

pub mod decision;
pub mod error;
pub mod experiment;
pub mod parameter_space;
pub mod tracking;

pub use decision::{
    ArmStats, BetaPrior, DecideOptions, Decision, DecisionError, ScoredOption, Strategy,
    UcbOptions, WeightedOption,
};
pub use error::DomainError;
pub use experiment::{
    ExperimentConfig, ExperimentId, ExperimentSummary, ExperimentValidationError, RunContext,
    RunOptions, RunStatus, Variant, VariantError, VariantId, VariantResult,
};
pub use parameter_space::{
    Combination, LabeledCombination, ParameterSpace, ParameterSpaceError, SampleOptions,
};
pub use tracking::{EventType, TrackingEvent, TrackingSink};
