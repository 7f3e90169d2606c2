//! Decision strategy errors

use thiserror::Error;

use crate::domain::DomainError;

/// Configuration errors rejected before any option is scored
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecisionError {
    #[error("No options to choose from")]
    EmptyOptions,

    #[error("Total weight must be positive, got {0}")]
    NonPositiveTotalWeight(f64),

    #[error("Weight must be a finite non-negative number, got {0}")]
    InvalidWeight(f64),

    #[error("Epsilon must be within [0, 1], got {0}")]
    EpsilonOutOfRange(f64),

    #[error("Beta prior parameters must be positive, got alpha={alpha}, beta={beta}")]
    InvalidPrior { alpha: f64, beta: f64 },

    #[error("Total count must be at least 1")]
    ZeroTotalCount,

    #[error("Exploration factor must be a finite non-negative number, got {0}")]
    InvalidExplorationFactor(f64),
}

impl From<DecisionError> for DomainError {
    fn from(err: DecisionError) -> Self {
        DomainError::configuration(err.to_string())
    }
}
