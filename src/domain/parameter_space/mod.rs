//! Parameter space generation
//!
//! Builds the Cartesian product of named candidate lists, with exact,
//! filtered and sampled enumeration.

mod combination;
mod error;
mod space;

pub use combination::{Combination, LabeledCombination};
pub use error::ParameterSpaceError;
pub use space::{Combinations, ParameterSpace, ParameterSpaceBuilder, SampleOptions};
