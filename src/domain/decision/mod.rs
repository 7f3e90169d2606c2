//! Decision domain module
//!
//! Inputs, outcomes and random samplers for the decision strategies. The
//! strategies themselves live in `infrastructure::decision` because they
//! emit tracking events.

mod error;
pub mod sampling;
mod types;

pub use error::DecisionError;
pub use sampling::{sample_beta, sample_gamma};
pub use types::{
    ArmStats, BetaPrior, DEFAULT_EXPLORATION_FACTOR, DecideOptions, Decision, ScoredOption,
    Strategy, UcbOptions, WeightedOption,
};
